//! Application configuration loaded from environment variables.

use sprint_rules::window::parse_allowed_sources;
use sprint_rules::ValidationSource;

use crate::errors::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL or file path
    pub database_url: String,
    /// Upper bound on pooled SQLite connections
    pub max_connections: u32,
    /// How often (in seconds) to look for word wars past their end time
    pub sweep_interval_secs: u64,
    /// Buffered progress signals before publishers wait
    pub progress_queue_capacity: usize,
    /// Validation sources offered to writers, in display order
    pub allowed_sources: Vec<ValidationSource>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite:./sprint_engine.db".to_string(),
            max_connections: 5,
            sweep_interval_secs: 30,
            progress_queue_capacity: 256,
            allowed_sources: parse_allowed_sources(None),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            database_url: env_var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?,
            progress_queue_capacity: parse_var(
                "PROGRESS_QUEUE_CAPACITY",
                defaults.progress_queue_capacity,
            )?,
            allowed_sources: parse_allowed_sources(
                env_var("ALLOWED_VALIDATION_SOURCES").ok().as_deref(),
            ),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| EngineError::Config(format!("Missing env var: {key}")))
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env_var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EngineError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}
