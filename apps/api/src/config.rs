//! API server configuration.
//!
//! Layers, later wins:
//! 1. Built-in defaults
//! 2. `materi.toml` (or the file named by `MATERI_CONFIG`), optional
//! 3. `MATERI__SECTION__KEY` environment variables, e.g. `MATERI__SERVER__PORT=8080`
//! 4. The conventional `DATABASE_PATH` and `PORT` variables

use std::env;

use axum::http::HeaderValue;
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};

use materi_db::DbConfig;

/// Default config file stem; `config` resolves the extension.
const DEFAULT_CONFIG_FILE: &str = "materi";

/// API server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API with credentials. Empty allows any
    /// origin without credentials.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Reject writes whose client-computed totals disagree with the server.
    /// When off, the server's values silently replace them.
    pub reject_mismatch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig {
                path: "materi.db".to_string(),
                max_connections: 5,
            },
            pricing: PricingConfig {
                reject_mismatch: true,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from the default file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = env::var("MATERI_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file)
    }

    /// Loads configuration using `file` as the optional config file.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(file, None)
    }

    /// Like [`load_from`](Self::load_from), reading environment variables
    /// from `vars` instead of the process environment when given.
    fn load_with_env(file: &str, vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let var = |key: &str| match &vars {
            Some(vars) => vars.get(key).cloned(),
            None => env::var(key).ok(),
        };

        let settings = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.cors_origins", defaults.server.cors_origins)?
            .set_default("database.path", defaults.database.path)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("pricing.reject_mismatch", defaults.pricing.reject_mismatch)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("MATERI")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .source(vars.clone()),
            )
            .set_override_option("database.path", var("DATABASE_PATH"))?
            .set_override_option("server.port", var("PORT"))?
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::MissingRequired("server.host".to_string()));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database.path".to_string()));
        }
        if self
            .server
            .cors_origins
            .iter()
            .any(|origin| HeaderValue::from_str(origin).is_err())
        {
            return Err(ConfigError::InvalidValue("server.cors_origins".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Builds the pool configuration for the configured database.
    pub fn db_config(&self) -> DbConfig {
        let memory = DbConfig::in_memory();
        if self.database.path == memory.database_path.to_string_lossy() {
            return memory;
        }
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}
