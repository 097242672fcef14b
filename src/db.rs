//! Database connection management.
//!
//! Opens the SeaORM pool backing the document store, retrying transient
//! connection failures with exponential backoff.

use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tokio::time::sleep;

use crate::config::AppConfig;

const MAX_CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Opens the connection pool described by `cfg`.
///
/// # Examples
///
/// ```no_run
/// use facility_ops::{config::AppConfig, db::init_pool};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let db = init_pool(&config).await?;
///     facility_ops::db::health_check(&db).await?;
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.trim().is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "Database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let mut retry_delay = INITIAL_RETRY_DELAY;
    let mut attempt = 1;
    loop {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                tracing::info!(attempt, "Connected to database");
                return Ok(conn);
            }
            Err(err) if attempt >= MAX_CONNECT_ATTEMPTS => {
                tracing::error!(attempts = attempt, error = %err, "Giving up on database connection");
                return Err(DatabaseError::ConnectionFailed { source: err }.into());
            }
            Err(err) => {
                tracing::warn!(
                    attempt,
                    error = %err,
                    retry_in_ms = retry_delay.as_millis() as u64,
                    "Database connection attempt failed"
                );
                sleep(retry_delay).await;
                retry_delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Runs `SELECT 1` against the pool.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());
    db.query_one(stmt)
        .await
        .context("Database health check failed")?;
    Ok(())
}
