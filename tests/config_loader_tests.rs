use facility_ops::config::{ConfigError, ConfigLoader};
use facility_ops::spatial::services::Language;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const VARS: [&str; 9] = [
    "FACILITY_PROFILE",
    "FACILITY_API_BIND_ADDR",
    "FACILITY_LOG_LEVEL",
    "FACILITY_LOG_FORMAT",
    "FACILITY_OPERATOR_TOKEN",
    "FACILITY_OPERATOR_TOKENS",
    "FACILITY_DEFAULT_LANGUAGE",
    "FACILITY_REPORT_CHART_TOP_N",
    "FACILITY_REPORT_PLACEHOLDER_LABEL",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.default_language, Language::Ar);
    assert_eq!(cfg.report.chart_top_n, 15);
    assert_eq!(cfg.report.placeholder_label, "Unknown");
    assert!(cfg.operator_tokens.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "FACILITY_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "FACILITY_API_BIND_ADDR=192.168.0.10:5000\nFACILITY_REPORT_CHART_TOP_N=5\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "FACILITY_API_BIND_ADDR=10.0.0.5:6000\n",
    );
    // Profile chosen in .env.local before the profile files load
    write_env_file(
        &temp_dir,
        ".env.local",
        "FACILITY_PROFILE=test\nFACILITY_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = loader(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.report.chart_top_n, 5);
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "FACILITY_API_BIND_ADDR=127.0.0.1:3000\nFACILITY_DEFAULT_LANGUAGE=ar\n",
    );

    unsafe {
        env::set_var("FACILITY_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("FACILITY_DEFAULT_LANGUAGE", "en");
    }

    let cfg = loader(&temp_dir).load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.default_language, Language::En);

    clear_env();
}

#[test]
fn operator_token_list_is_split_and_trimmed() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "FACILITY_PROFILE=production\nFACILITY_OPERATOR_TOKENS= alpha , beta ,,\n",
    );

    let cfg = loader(&temp_dir).load().expect("tokens satisfy production");
    assert_eq!(cfg.operator_tokens, vec!["alpha", "beta"]);

    let redacted = cfg.redacted_json().unwrap();
    assert!(!redacted.contains("alpha"));
}

#[test]
fn production_without_tokens_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "FACILITY_PROFILE=production\n");

    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::MissingOperatorTokens));
}

#[test]
fn invalid_values_return_errors() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("FACILITY_API_BIND_ADDR", "not-an-addr");
    }
    let err = loader(&temp_dir).load().expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));
    clear_env();

    unsafe {
        env::set_var("FACILITY_DEFAULT_LANGUAGE", "fr");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLanguage { .. }));
    clear_env();

    unsafe {
        env::set_var("FACILITY_REPORT_CHART_TOP_N", "0");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidChartTopN { value: 0 }));
    clear_env();

    unsafe {
        env::set_var("FACILITY_LOG_FORMAT", "xml");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLogFormat { .. }));
    clear_env();
}
