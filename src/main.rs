//! # Facility Operations API Main Entry Point

use facility_ops::{
    config::ConfigLoader,
    db::init_pool,
    migration::{Migrator, MigratorTrait},
    server::run_server,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Layered env files, then FACILITY_* variables
    let config = ConfigLoader::new().load()?;

    init_tracing(&config)?;
    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied");

    run_server(config, db).await
}
