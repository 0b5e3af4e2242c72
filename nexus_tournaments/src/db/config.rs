//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::{env, str::FromStr};
use thiserror::Error;

/// Error reading database settings from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT_SECS`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT_SECS`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME_SECS`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` is unset or a pool setting does not parse.
    pub fn from_env() -> Result<Self, DatabaseConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| DatabaseConfigError::Missing("DATABASE_URL"))?;
        Self::with_url(database_url)
    }

    /// Pool settings from the environment with an explicit connection URL
    pub fn with_url(database_url: impl Into<String>) -> Result<Self, DatabaseConfigError> {
        let defaults = Self::development();
        Ok(Self {
            database_url: database_url.into(),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections)?,
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            )?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs)?,
        })
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/nexus_tournaments` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/nexus_tournaments".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, DatabaseConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| DatabaseConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_with_url_uses_defaults() {
        // SAFETY: serialized with the other env-mutating tests
        unsafe {
            env::remove_var("DB_MAX_CONNECTIONS");
            env::remove_var("DB_MIN_CONNECTIONS");
        }
        let config = DatabaseConfig::with_url("postgres://localhost/test").unwrap();
        assert_eq!(config.database_url, "postgres://localhost/test");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
    }

    #[test]
    #[serial]
    fn test_invalid_pool_size_is_reported() {
        // SAFETY: serialized with the other env-mutating tests
        unsafe { env::set_var("DB_MAX_CONNECTIONS", "lots") };
        let err = DatabaseConfig::with_url("postgres://localhost/test").unwrap_err();
        unsafe { env::remove_var("DB_MAX_CONNECTIONS") };
        assert_eq!(
            err,
            DatabaseConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                value: "lots".to_string()
            }
        );
    }
}
