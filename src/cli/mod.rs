//! CLI definitions.

pub mod commands;
mod context;

pub use context::AppContext;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "papertrade")]
#[command(author, version, about = "Virtual trading simulator with an auditable trade ledger")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Acting user; every portfolio operation is checked against this ID
    #[arg(short = 'u', long, env = "PAPERTRADE_USER", default_value = "local")]
    pub user: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage portfolios
    #[command(subcommand)]
    Portfolio(PortfolioCmd),
    /// Manage trading strategies
    #[command(subcommand)]
    Strategy(StrategyCmd),
    /// Record and inspect signal scores
    #[command(subcommand)]
    Signal(SignalCmd),
    /// Execute trades and inspect the trade log
    #[command(subcommand)]
    Trade(TradeCmd),
    /// Run the auto-trading evaluator
    Auto(AutoArgs),
    /// Rewind a portfolio along its trade log
    Replay(ReplayArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Subcommand)]
pub enum PortfolioCmd {
    /// Create a new portfolio
    Create(PortfolioCreateArgs),
    /// List the acting user's portfolios
    List,
    /// Show one portfolio with freshly marked valuations
    Show(PortfolioShowArgs),
    /// Configure auto-trading
    SetAuto(SetAutoArgs),
}

#[derive(clap::Args)]
pub struct PortfolioCreateArgs {
    /// Display name
    #[arg(short, long)]
    pub name: String,

    /// Starting cash
    #[arg(short, long, default_value = "100000")]
    pub balance: Decimal,
}

#[derive(clap::Args)]
pub struct PortfolioShowArgs {
    /// Portfolio ID
    pub id: Uuid,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[derive(clap::Args)]
pub struct SetAutoArgs {
    /// Portfolio ID
    pub id: Uuid,

    /// Disable auto-trading instead of enabling it
    #[arg(long)]
    pub off: bool,

    /// Ceiling on auto-trades per day
    #[arg(long)]
    pub max_trades: Option<u32>,

    /// Per-order equity fraction cap, e.g. 0.10
    #[arg(long)]
    pub risk_limit: Option<Decimal>,
}

#[derive(Subcommand)]
pub enum StrategyCmd {
    /// Add a strategy to a portfolio
    Add(StrategyAddArgs),
    /// List a portfolio's strategies
    List(StrategyListArgs),
}

#[derive(clap::Args)]
pub struct StrategyAddArgs {
    /// Portfolio ID
    #[arg(short, long)]
    pub portfolio: Uuid,

    /// Display name
    #[arg(short, long)]
    pub name: String,

    /// Signal sourcing mode (manual, rule-based, agent-based)
    #[arg(short, long, default_value = "rule-based")]
    pub kind: String,

    /// Minimum absolute score that triggers a trade
    #[arg(short, long, default_value = "0.5")]
    pub threshold: Decimal,

    /// Symbols to trade (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Target position value as a fraction of equity
    #[arg(long, default_value = "0.05")]
    pub fraction: Decimal,

    /// Pick the strategy up automatically on evaluator runs
    #[arg(long)]
    pub auto: bool,
}

#[derive(clap::Args)]
pub struct StrategyListArgs {
    /// Portfolio ID
    #[arg(short, long)]
    pub portfolio: Uuid,
}

#[derive(Subcommand)]
pub enum SignalCmd {
    /// Record an externally produced signal score
    Record(SignalRecordArgs),
    /// List recent signals for a symbol, newest first
    List(SignalListArgs),
}

#[derive(clap::Args)]
pub struct SignalRecordArgs {
    /// Symbol the score applies to
    #[arg(short, long)]
    pub symbol: String,

    /// Directional score in [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    pub score: Decimal,

    /// Producer name
    #[arg(long, default_value = "manual")]
    pub source: String,
}

#[derive(clap::Args)]
pub struct SignalListArgs {
    /// Symbol to inspect
    #[arg(short, long)]
    pub symbol: String,

    /// Maximum rows to print
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

#[derive(Subcommand)]
pub enum TradeCmd {
    /// Buy shares
    Buy(TradeArgs),
    /// Sell shares
    Sell(TradeArgs),
    /// Show the trade log, newest first
    History(HistoryArgs),
}

#[derive(clap::Args)]
pub struct TradeArgs {
    /// Portfolio ID
    #[arg(short, long)]
    pub portfolio: Uuid,

    /// Symbol to trade
    #[arg(short, long)]
    pub symbol: String,

    /// Share quantity
    #[arg(short, long)]
    pub quantity: Decimal,

    /// Explicit execution price; fetched from the data source when omitted
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[derive(clap::Args)]
pub struct HistoryArgs {
    /// Portfolio ID
    #[arg(short, long)]
    pub portfolio: Uuid,

    /// Maximum rows to print
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

#[derive(clap::Args)]
pub struct AutoArgs {
    /// Portfolio ID
    #[arg(short, long)]
    pub portfolio: Uuid,

    /// Run only this strategy
    #[arg(long)]
    pub strategy: Option<Uuid>,

    /// Override the strategies' symbol lists (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[derive(clap::Args)]
pub struct ReplayArgs {
    /// Portfolio ID
    #[arg(short, long)]
    pub portfolio: Uuid,

    /// Cutoff instant (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Destructive: wipe the trade history and restart at the cutoff
    #[arg(long, requires = "to")]
    pub reset: bool,

    /// Confirm a destructive reset
    #[arg(long)]
    pub yes: bool,

    /// Return the portfolio to the live clock
    #[arg(long, conflicts_with_all = ["to", "reset"])]
    pub resume: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}
