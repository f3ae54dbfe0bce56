//! Configuration structures.

use config::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub risk: RiskSettings,
}

impl AppConfig {
    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.risk.default_risk_limit <= Decimal::ZERO
            || self.risk.default_risk_limit > Decimal::ONE
        {
            return Err(ConfigError::Message(format!(
                "risk.default_risk_limit must be in (0, 1], got {}",
                self.risk.default_risk_limit
            )));
        }
        if self.risk.default_max_trades_per_day == 0 {
            return Err(ConfigError::Message(
                "risk.default_max_trades_per_day must be at least 1".to_string(),
            ));
        }
        match self.data.source {
            DataSourceKind::Csv => {
                if self.data.csv_path.is_none() {
                    return Err(ConfigError::Message(
                        "data.csv_path is required when data.source is csv".to_string(),
                    ));
                }
            }
            DataSourceKind::Http => {
                if self.data.quote_url.trim().is_empty() {
                    return Err(ConfigError::Message(
                        "data.quote_url is required when data.source is http".to_string(),
                    ));
                }
            }
        }
        if self.data.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "data.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "papertrade".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Ledger storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// SQLite database file
    pub path: String,
    /// Use a throwaway in-memory ledger instead of the file
    pub in_memory: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            path: "papertrade.db".to_string(),
            in_memory: false,
        }
    }
}

/// Which price source backs quote lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    Csv,
    Http,
}

/// Market data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub source: DataSourceKind,
    /// Price table for the csv source
    pub csv_path: Option<String>,
    /// Quote service base URL for the http source
    pub quote_url: String,
    /// Analysis agent base URL; empty disables agent-based strategies
    pub agent_url: String,
    pub timeout_secs: u64,
    /// Quote cache TTL; zero disables caching
    pub cache_ttl_secs: i64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            source: DataSourceKind::Http,
            csv_path: None,
            quote_url: "http://localhost:8600".to_string(),
            agent_url: "http://localhost:8602".to_string(),
            timeout_secs: 10,
            cache_ttl_secs: 30,
        }
    }
}

/// Defaults applied when a portfolio enables auto-trading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub default_risk_limit: Decimal,
    pub default_max_trades_per_day: u32,
}

impl Default for RiskSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            default_risk_limit: dec!(0.10),
            default_max_trades_per_day: 10,
        }
    }
}
