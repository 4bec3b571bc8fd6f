//! CLI configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                        | Default                          |
//! |---------------------------------|----------------------------------|
//! | `VOUCHER_STORE`                 | `sqlite` (`memory` also allowed) |
//! | `VOUCHER_DB_PATH`               | `<data dir>/voucher.db`          |
//! | `VOUCHER_DEFAULT_CURRENCY`      | `BRL`                            |
//! | `VOUCHER_DEFAULT_VALIDITY_DAYS` | `30`                             |

use directories::ProjectDirs;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use voucher_core::validation::validate_currency;
use voucher_core::{DEFAULT_CURRENCY, DEFAULT_VALIDITY_DAYS};

/// Where discounts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// SQLite file through voucher-db.
    Sqlite,
    /// Process memory; everything is lost on exit.
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(ConfigError::InvalidValue("VOUCHER_STORE".to_string())),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Sqlite => f.write_str("sqlite"),
            StoreKind::Memory => f.write_str("memory"),
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub store: StoreKind,

    /// SQLite file. `None` for the memory store.
    pub database_path: Option<PathBuf>,

    /// Currency offered by default at the prompts.
    pub default_currency: String,

    /// Validity offered by default when creating discounts.
    pub default_validity_days: u32,
}

impl CliConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("VOUCHER_STORE") {
            Some(raw) => raw.parse()?,
            None => StoreKind::Sqlite,
        };

        let database_path = match (store, lookup("VOUCHER_DB_PATH")) {
            (StoreKind::Memory, _) => None,
            (StoreKind::Sqlite, Some(path)) if !path.trim().is_empty() => {
                Some(PathBuf::from(path))
            }
            (StoreKind::Sqlite, _) => Some(default_database_path()?),
        };

        let default_currency = validate_currency(
            &lookup("VOUCHER_DEFAULT_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        )
        .map_err(|_| ConfigError::InvalidValue("VOUCHER_DEFAULT_CURRENCY".to_string()))?;

        let default_validity_days = lookup("VOUCHER_DEFAULT_VALIDITY_DAYS")
            .unwrap_or_else(|| DEFAULT_VALIDITY_DAYS.to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("VOUCHER_DEFAULT_VALIDITY_DAYS".to_string()))?;

        Ok(CliConfig {
            store,
            database_path,
            default_currency,
            default_validity_days,
        })
    }

    /// In-memory configuration with the built-in defaults.
    pub fn in_memory() -> Self {
        CliConfig {
            store: StoreKind::Memory,
            database_path: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

/// Platform-specific database location.
///
/// - **macOS**: `~/Library/Application Support/com.voucher.voucher/voucher.db`
/// - **Windows**: `%APPDATA%\voucher\voucher\data\voucher.db`
/// - **Linux**: `~/.local/share/voucher/voucher.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "voucher", "voucher").ok_or(ConfigError::NoDataDir)?;
    Ok(dirs.data_dir().join("voucher.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine the data directory; set VOUCHER_DB_PATH")]
    NoDataDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::from_lookup(lookup(&[("VOUCHER_DB_PATH", "/tmp/v.db")])).unwrap();
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/v.db")));
        assert_eq!(config.default_currency, "BRL");
        assert_eq!(config.default_validity_days, 30);
    }

    #[test]
    fn test_memory_store_has_no_path() {
        let config = CliConfig::from_lookup(lookup(&[
            ("VOUCHER_STORE", "Memory"),
            ("VOUCHER_DB_PATH", "/tmp/ignored.db"),
            ("VOUCHER_DEFAULT_CURRENCY", "usd"),
            ("VOUCHER_DEFAULT_VALIDITY_DAYS", "7"),
        ]))
        .unwrap();

        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.database_path, None);
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.default_validity_days, 7);
    }

    #[test]
    fn test_invalid_values() {
        let err = CliConfig::from_lookup(lookup(&[("VOUCHER_STORE", "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "VOUCHER_STORE"));

        let err = CliConfig::from_lookup(lookup(&[
            ("VOUCHER_STORE", "memory"),
            ("VOUCHER_DEFAULT_CURRENCY", "reais"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "VOUCHER_DEFAULT_CURRENCY"));

        let err = CliConfig::from_lookup(lookup(&[
            ("VOUCHER_STORE", "memory"),
            ("VOUCHER_DEFAULT_VALIDITY_DAYS", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
