use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Enables the bulk data reset endpoint
    #[serde(default)]
    pub testing: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

/// Bounded retry applied to database initialisation at startup
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub count: u32,
    pub delay_seconds: u64,
    pub backoff: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            count: 5,
            delay_seconds: 1,
            backoff: 2,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `SHELF_DATABASE__URL=postgres://...` sets `database.url`
            .add_source(config::Environment::with_prefix("SHELF").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
