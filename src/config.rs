//! Configuration module
//!
//! Loads configuration from environment variables.

use chrono::FixedOffset;
use std::env;
use std::str::FromStr;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(StorageKind::Postgres),
            "memory" => Ok(StorageKind::Memory),
            _ => Err(()),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL, absent only with in-memory storage
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub storage: StorageKind,

    /// Offset of the reference zone for calendar days and months, in minutes east of UTC
    pub reference_utc_offset_minutes: i32,

    /// Default validity of newly issued cards
    pub card_validity_years: u32,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let storage: StorageKind = var_or("STORAGE", "postgres")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("STORAGE"))?;

        let database_url = lookup("DATABASE_URL");
        if storage == StorageKind::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = var_or("HOST", "127.0.0.1");

        let port = var_or("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var_or("ENVIRONMENT", "development");

        let reference_utc_offset_minutes: i32 = var_or("REFERENCE_UTC_OFFSET_MINUTES", "180")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("REFERENCE_UTC_OFFSET_MINUTES"))?;
        if reference_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue("REFERENCE_UTC_OFFSET_MINUTES"));
        }

        let card_validity_years = var_or("CARD_VALIDITY_YEARS", "4")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CARD_VALIDITY_YEARS"))?;

        let log_format = var_or("LOG_FORMAT", "pretty")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOG_FORMAT"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            storage,
            reference_utc_offset_minutes,
            card_validity_years,
            log_format,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Reference zone for expiry checks and limit windows
    pub fn reference_zone(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.reference_utc_offset_minutes * 60)
            .ok_or(ConfigError::InvalidValue("REFERENCE_UTC_OFFSET_MINUTES"))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/cards")]).unwrap();

        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.storage, StorageKind::Postgres);
        assert_eq!(config.card_validity_years, 4);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.reference_zone().unwrap().local_minus_utc(), 3 * 3600);
        assert!(!config.is_production());
    }

    #[test]
    fn test_database_url_required_for_postgres() {
        assert!(matches!(
            config(&[]),
            Err(ConfigError::MissingEnv("DATABASE_URL"))
        ));
        assert!(config(&[("STORAGE", "memory")]).is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("STORAGE", "memory"), ("PORT", "http")]),
            Err(ConfigError::InvalidValue("PORT"))
        ));
        assert!(matches!(
            config(&[("STORAGE", "redis")]),
            Err(ConfigError::InvalidValue("STORAGE"))
        ));
        assert!(matches!(
            config(&[("STORAGE", "memory"), ("REFERENCE_UTC_OFFSET_MINUTES", "1440")]),
            Err(ConfigError::InvalidValue("REFERENCE_UTC_OFFSET_MINUTES"))
        ));
    }
}
