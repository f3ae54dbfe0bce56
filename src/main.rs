//! Papertrade CLI application.

mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use logging::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level {
        cli::LogLevel::Trace => "trace",
        cli::LogLevel::Debug => "debug",
        cli::LogLevel::Info => "info",
        cli::LogLevel::Warn => "warn",
        cli::LogLevel::Error => "error",
    };
    setup_logging(log_level, cli.json_logs);

    // Execute command
    match cli.command {
        Commands::Portfolio(cmd) => {
            cli::commands::portfolio::run(cmd, &cli.user, &cli.config).await
        }
        Commands::Strategy(cmd) => cli::commands::strategy::run(cmd, &cli.user, &cli.config).await,
        Commands::Signal(cmd) => cli::commands::signal::run(cmd, &cli.config).await,
        Commands::Trade(cmd) => cli::commands::trade::run(cmd, &cli.user, &cli.config).await,
        Commands::Auto(args) => cli::commands::auto::run(args, &cli.user, &cli.config).await,
        Commands::Replay(args) => cli::commands::replay::run(args, &cli.user, &cli.config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
