//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, DataSettings, DataSourceKind, LedgerSettings, LoggingConfig,
    RiskSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// The file is optional so the binary runs on pure defaults; environment
/// variables use the `PAPERTRADE__SECTION__KEY` shape and win over the
/// file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix("PAPERTRADE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
