//! Application configuration.
//!
//! Loaded from `DEPOT_*` environment variables with fallback to defaults,
//! then turned into a [`DbConfig`].
//!
//! | Variable                         | Default            |
//! |----------------------------------|--------------------|
//! | `DEPOT_DATABASE_PATH`            | `./depot.db`       |
//! | `DEPOT_DB_MAX_CONNECTIONS`       | `5`                |
//! | `DEPOT_DB_MIN_CONNECTIONS`       | `1`                |
//! | `DEPOT_DB_CONNECT_TIMEOUT_SECS`  | `30`               |
//! | `DEPOT_NEGATIVE_STOCK`           | `allow`            |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use depot_core::NegativeStockPolicy;
use serde::{Deserialize, Serialize};

use crate::pool::DbConfig;

pub const DEFAULT_DATABASE_PATH: &str = "./depot.db";

/// Runtime configuration for anything that opens the inventory database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub negative_stock: NegativeStockPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 30,
            negative_stock: NegativeStockPolicy::Allow,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let config = AppConfig {
            database_path: lookup("DEPOT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "DEPOT_DB_MAX_CONNECTIONS", defaults.max_connections)?,

            min_connections: parse_or(&lookup, "DEPOT_DB_MIN_CONNECTIONS", defaults.min_connections)?,

            connect_timeout_secs: parse_or(
                &lookup,
                "DEPOT_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,

            negative_stock: parse_or(&lookup, "DEPOT_NEGATIVE_STOCK", defaults.negative_stock)?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "DEPOT_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.min_connections > config.max_connections {
            return Err(ConfigError::PoolBounds {
                min: config.min_connections,
                max: config.max_connections,
            });
        }

        Ok(config)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .stock_policy(self.negative_stock)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Minimum pool size {min} exceeds maximum {max}")]
    PoolBounds { min: u32, max: u32 },
}
