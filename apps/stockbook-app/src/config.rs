//! # Application Configuration
//!
//! Loaded once at startup, read-only afterwards.
//!
//! ## Sources (later wins)
//! 1. Defaults (this file)
//! 2. Config file (`stockbook.toml`, optional)
//! 3. Environment variables (`STOCKBOOK_*`, e.g. `STOCKBOOK_INVOICE_PREFIX=FAC`)
//!
//! ## Database Location
//! `database_path` when set, otherwise the platform data directory:
//! - **Linux**: `~/.local/share/stockbook/stockbook.db`
//! - **macOS**: `~/Library/Application Support/app.stockbook.stockbook/stockbook.db`
//! - **Windows**: `%APPDATA%\stockbook\stockbook\data\stockbook.db`

use ::config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use stockbook_core::validation::validate_tax_rate_bps;
use stockbook_core::{DEFAULT_INVOICE_PREFIX, DEFAULT_LOW_STOCK_THRESHOLD};
use stockbook_db::DbConfig;

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "stockbook.toml";

const ENV_PREFIX: &str = "STOCKBOOK";
const DB_FILE: &str = "stockbook.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Could not determine app data directory")]
    NoDataDirectory,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Could not create data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file, or `:memory:`. Default: platform data directory.
    pub database_path: Option<PathBuf>,

    pub max_connections: u32,

    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Prefix of generated invoice numbers (`INV-000001`).
    pub invoice_prefix: String,

    /// Products at or below this quantity count as low stock.
    pub low_stock_threshold: i64,

    /// Tax rate offered by the invoice form, in basis points.
    pub default_tax_rate_bps: u32,

    /// Currency symbol used when formatting amounts for display.
    pub currency_symbol: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: None,
            max_connections: 5,
            busy_timeout_ms: 5_000,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            default_tax_rate_bps: 2000,
            currency_symbol: "$".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads from `stockbook.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads with an explicit config file path; a missing file is fine.
    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(file).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the database layer would misbehave with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(invalid("max_connections", "must be at least 1"));
        }
        if self.invoice_prefix.trim().is_empty() {
            return Err(invalid("invoice_prefix", "must not be empty"));
        }
        if self.low_stock_threshold < 0 {
            return Err(invalid("low_stock_threshold", "must not be negative"));
        }
        validate_tax_rate_bps(self.default_tax_rate_bps)
            .map_err(|e| invalid("default_tax_rate_bps", &e.to_string()))?;
        Ok(())
    }

    /// The database file to open, creating the data directory if needed.
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("app", "stockbook", "stockbook").ok_or(ConfigError::NoDataDirectory)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join(DB_FILE))
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        Ok(DbConfig::new(self.resolve_database_path()?)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .invoice_prefix(self.invoice_prefix.trim()))
    }

    /// Formats a cent amount for display.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = AppConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        format!("{}{}{}.{:02}", sign, self.currency_symbol, abs / 100, abs % 100)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stockbook-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.low_stock_threshold, 20);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/stockbook.toml")).unwrap();
        assert_eq!(config.max_connections, AppConfig::default().max_connections);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = temp_file(
            "override",
            r#"
            database_path = ":memory:"
            invoice_prefix = "FAC"
            low_stock_threshold = 5
            "#,
        );

        let config = AppConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.invoice_prefix, "FAC");
        assert_eq!(config.low_stock_threshold, 5);
        assert_eq!(config.resolve_database_path().unwrap(), PathBuf::from(":memory:"));
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = temp_file("invalid", "max_connections = 0\n");
        let result = AppConfig::load_from(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let config = AppConfig {
            default_tax_rate_bps: 10_001,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_currency() {
        let config = AppConfig::default();
        assert_eq!(config.format_currency(1234), "$12.34");
        assert_eq!(config.format_currency(5), "$0.05");
        assert_eq!(config.format_currency(-1234), "-$12.34");
    }
}
