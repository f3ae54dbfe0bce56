//! Validate configuration command.

use anyhow::Result;
use papertrade_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!(
        "Ledger: {}",
        if config.ledger.in_memory {
            "in-memory".to_string()
        } else {
            config.ledger.path.clone()
        }
    );
    println!("Data source: {:?}", config.data.source);
    println!("Quote cache TTL: {}s", config.data.cache_ttl_secs);
    println!("Default risk limit: {}", config.risk.default_risk_limit);
    println!(
        "Default max auto-trades/day: {}",
        config.risk.default_max_trades_per_day
    );

    Ok(())
}
