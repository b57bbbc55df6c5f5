//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use arena_core::db::{DatabaseConfig, InvalidSetting};
use std::net::SocketAddr;
use std::time::Duration;

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Minimum JWT secret length (128-bit security)
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Where tournaments, wallets and profiles are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Command-line values that take precedence over the environment
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Storage backend selection
    pub storage: StorageBackend,
    /// JWT signing secret shared with the account service
    pub jwt_secret: String,
    /// How often due credential releases are promoted to Live
    pub release_sweep_interval: Duration,
    /// Prometheus scrape listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Apply schema migrations at startup
    pub run_migrations: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or unparseable
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or_else(default_bind),
        };

        let mut database = DatabaseConfig::from_env()?;
        if let Some(url) = overrides.database_url {
            database.database_url = url;
        }

        let storage = if overrides.memory {
            StorageBackend::Memory
        } else {
            parse_env("STORAGE_BACKEND")?.unwrap_or(StorageBackend::Postgres)
        };

        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let sweep_secs: u64 = parse_env("RELEASE_SWEEP_INTERVAL_SECS")?.unwrap_or(30);

        Ok(ServerConfig {
            bind,
            database,
            storage,
            jwt_secret,
            release_sweep_interval: Duration::from_secs(sweep_secs),
            metrics_bind: parse_env("METRICS_BIND")?,
            run_migrations: parse_env("RUN_MIGRATIONS")?.unwrap_or(true),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_JWT_SECRET_LEN} characters"),
            });
        }

        if self.release_sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "RELEASE_SWEEP_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.storage == StorageBackend::Postgres {
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
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

impl From<InvalidSetting> for ConfigError {
    fn from(err: InvalidSetting) -> Self {
        ConfigError::Invalid {
            var: err.var,
            reason: err.reason,
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse an optional environment variable, rejecting malformed values
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            database: DatabaseConfig::development(),
            storage: StorageBackend::Memory,
            jwt_secret: "a".repeat(32),
            release_sweep_interval: Duration::from_secs(30),
            metrics_bind: None,
            run_migrations: true,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_invalid_database_setting_names_variable() {
        let err = ConfigError::from(InvalidSetting {
            var: "DB_MAX_CONNECTIONS".to_string(),
            reason: "\"2O\": invalid digit found in string".to_string(),
        });
        assert!(matches!(&err, ConfigError::Invalid { var, .. } if var == "DB_MAX_CONNECTIONS"));
        assert!(err.to_string().contains("2O"));
    }

    #[test]
    fn test_default_bind_matches_constant() {
        assert_eq!(default_bind(), DEFAULT_BIND.parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = config();
        config.jwt_secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = config();
        config.release_sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_bounds_checked_for_postgres_only() {
        let mut config = config();
        config.database.min_connections = 50;
        config.database.max_connections = 10;
        assert!(config.validate().is_ok());

        config.storage = StorageBackend::Postgres;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse(), Ok(StorageBackend::Memory));
        assert_eq!(" Postgres ".parse(), Ok(StorageBackend::Postgres));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
