//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use nexus_tournaments::{
    db::{DatabaseConfig, DatabaseConfigError},
    events::DEFAULT_EVENT_BUFFER_SIZE,
};
use std::{net::SocketAddr, str::FromStr};

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Where tournament data lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres(DatabaseConfig),
    /// Process-local store; data is lost on restart
    Memory,
}

/// Values given on the command line, which win over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
    pub metrics_bind: Option<SocketAddr>,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Store backend
    pub store: StoreBackend,
    /// Per-observer event buffer
    pub event_buffer_size: usize,
    /// Prometheus listener, if metrics are enabled
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(cli: CliOverrides) -> Result<Self, ConfigError> {
        let bind = match cli.bind {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or_else(default_bind),
        };

        let memory = cli.memory
            || std::env::var("STORE_BACKEND").is_ok_and(|v| v.eq_ignore_ascii_case("memory"));

        let store = if memory {
            StoreBackend::Memory
        } else {
            let database_url = cli
                .database_url
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .unwrap_or_else(|| DatabaseConfig::development().database_url);
            StoreBackend::Postgres(DatabaseConfig::with_url(database_url)?)
        };

        let event_buffer_size =
            parse_env("EVENT_BUFFER_SIZE")?.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);

        let metrics_bind = match cli.metrics_bind {
            Some(addr) => Some(addr),
            None => parse_env("METRICS_BIND")?,
        };

        Ok(ServerConfig {
            bind,
            store,
            event_buffer_size,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                var: "EVENT_BUFFER_SIZE".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if let StoreBackend::Postgres(database) = &self.store {
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl From<DatabaseConfigError> for ConfigError {
    fn from(err: DatabaseConfigError) -> Self {
        match err {
            DatabaseConfigError::Missing(var) => ConfigError::MissingRequired {
                var: var.to_string(),
                hint: "Set it in the environment or .env, or pass --memory".to_string(),
            },
            DatabaseConfigError::Invalid { var, value } => ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("cannot parse '{value}'"),
            },
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse an optional environment variable, rejecting malformed values
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("cannot parse '{value}'"),
        }),
        Err(_) => Ok(None),
    }
}
