//! For interacting with the database.

use super::config::DatabaseConfig;
use sqlx::{
    migrate::MigrateError,
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use std::str::FromStr;
use tracing::log::LevelFilter;

/// A common database pool type.
pub type DbPool = PgPool;

/// Connects to the database at `url` using the pool settings in `config`.
///
/// The pool connects lazily, so this does not fail if the database is down.
pub fn init_db(url: &str, config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let db_options = PgConnectOptions::from_str(url)?.log_statements(LevelFilter::Debug);
    let db = PgPoolOptions::new()
        .acquire_timeout(config.acquire_timeout)
        .min_connections(1)
        .max_connections(config.max_connections)
        .connect_lazy_with(db_options);
    Ok(db)
}

/// Applies the embedded migrations.
#[tracing::instrument(skip_all)]
pub async fn migrate(db: &DbPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(db).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
