//! Ledger and portfolio-state engine.
//!
//! The executor applies single trades atomically under per-portfolio
//! locks, the aggregator recomputes portfolio roll-ups, and the replay
//! engine rebuilds historical state from the trade log.

pub mod aggregator;
pub mod executor;
pub mod locks;
pub mod positions;
pub mod replay;

pub use aggregator::PortfolioAggregator;
pub use executor::{TradeExecutor, TradeOutcome};
pub use locks::PortfolioLocks;
pub use positions::PositionManager;
pub use replay::{ReplayEngine, ReplayHolding, ReplaySnapshot};
