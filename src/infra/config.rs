//! For reading application configuration.

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Where and how uploaded images are stored.
    pub uploads: UploadConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Server address.
    pub address: String,
    /// Server http port.
    pub port: u16,
    /// Requests taking longer than this are aborted.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// The maximum number of requests handled at once.
    pub concurrency_limit: usize,
}

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string.
    /// Items are kept in memory when this is not set.
    pub url: Option<String>,
    /// The maximum size of the connection pool.
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

/// Upload configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadConfig {
    /// The directory assets are written to.
    pub dir: PathBuf,
    /// The URL path the directory is served under, e.g. `/uploads`.
    pub public_prefix: String,
    /// Whether to shrink and recompress uploaded images.
    pub resize: bool,
    /// Maximum width of a resized image, in pixels.
    pub max_width: u32,
    /// JPEG quality of a resized image, 1-100.
    pub quality: u8,
    /// The largest request body accepted by the item endpoints.
    pub max_upload_bytes: usize,
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directives, overridden by `RUST_LOG`.
    pub filter: String,
    /// Write JSON logs to daily files in this directory.
    pub directory: Option<PathBuf>,
}

/// The built-in defaults every other source is layered on.
fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("server.address", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("server.request_timeout", "10s")?
        .set_default("server.concurrency_limit", 500)?
        .set_default("database.max_connections", 20)?
        .set_default("database.acquire_timeout", "5s")?
        .set_default("uploads.dir", "uploads")?
        .set_default("uploads.public_prefix", "/uploads")?
        .set_default("uploads.resize", true)?
        .set_default("uploads.max_width", 300)?
        .set_default("uploads.quality", 60)?
        .set_default("uploads.max_upload_bytes", 10 * 1024 * 1024)?
        .set_default("logging.filter", "info,tower_http=debug,item_catalog=debug")
}

/// Retrieve [`Config`] from defaults, `config.toml` and the environment.
#[tracing::instrument]
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    defaults()?
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .set_override_option("server.port", std::env::var("PORT").ok())?
        .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
        .build()
        .and_then(finish)
}

/// The default configuration, ignoring files and the environment.
pub fn default_config() -> Result<Config, ConfigError> {
    defaults()?.build().and_then(finish)
}

/// Deserializes and normalizes a built configuration.
fn finish(config: config::Config) -> Result<Config, ConfigError> {
    let mut config: Config = config.try_deserialize()?;
    config.uploads.public_prefix = normalize_prefix(&config.uploads.public_prefix)?;
    Ok(config)
}

/// Turns a URL prefix into the `/a/b` form the router nests under.
fn normalize_prefix(prefix: &str) -> Result<String, ConfigError> {
    let trimmed = prefix.trim().trim_matches('/');
    let valid = !trimmed.is_empty()
        && trimmed.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    if !valid {
        return Err(ConfigError::Message(format!(
            "uploads.public_prefix {prefix:?} must be a plain path below the root, like \"/uploads\""
        )));
    }
    Ok(format!("/{trimmed}"))
}
