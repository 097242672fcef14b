//! Logging setup for the facility operations service and the per-request
//! trace id that ties handler logs, error bodies and responses together.

use std::any::type_name_of_val;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing::Instrument;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};
use uuid::Uuid;

use crate::config::AppConfig;

/// Header carrying the request correlation id in both directions.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Crates whose output is capped regardless of the configured level: SQL
/// statements from the store and per-request lines already covered by the
/// request span.
const QUIET_TARGETS: &[(&str, &str)] = &[
    ("sea_orm", "warn"),
    ("sea_orm_migration", "info"),
    ("sqlx", "warn"),
    ("tower_http", "info"),
];

/// Filter directives for `level`: the service itself logs at `level`,
/// database and HTTP plumbing stay quiet.
pub fn default_filter_directives(level: &str) -> String {
    let mut directives = vec![level.to_string(), format!("facility_ops={level}")];
    directives.extend(
        QUIET_TARGETS
            .iter()
            .map(|(target, cap)| format!("{target}={cap}")),
    );
    directives.join(",")
}

fn env_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter_directives(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Trace id of the request being served.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static ACTIVE_TRACE_CONTEXT: TraceContext;
}

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber once. `RUST_LOG` overrides the configured
/// level; `log::` records from SeaORM and sqlx are bridged in.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
        && !type_name_of_val(log::logger()).contains("LogTracer")
    {
        eprintln!("facility-ops: database driver logs will not be captured: {err}");
    }

    let env_filter = env_filter(config);

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!("facility-ops: keeping the existing tracing subscriber: {err}");
    }

    Ok(())
}

/// Execute `future` within the provided trace context, making it available through task-local
/// storage for the duration of the request.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_TRACE_CONTEXT.scope(context, future).await
}

/// Get the currently active trace ID, if one has been set for the running task.
pub fn current_trace_id() -> Option<String> {
    ACTIVE_TRACE_CONTEXT
        .try_with(|ctx| ctx.trace_id.clone())
        .ok()
}

/// Assigns every request a trace id (reusing an inbound `x-trace-id`), runs
/// the handler inside a `request` span carrying it, and echoes it back.
pub async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let context = TraceContext {
        trace_id: trace_id.clone(),
    };
    request.extensions_mut().insert(context.clone());

    let mut response = with_trace_context(context, next.run(request))
        .instrument(span)
        .await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
