//! Core data types for the trading engine.

mod portfolio;
mod position;
mod report;
mod signal;
mod strategy;
mod trade;

pub use portfolio::Portfolio;
pub use position::{close_epsilon, Position};
pub use report::{ErroredItem, ExecutedItem, RunReport, RunSummary, SkipReason, SkippedItem};
pub use signal::Signal;
pub use strategy::{Strategy, StrategyConfig, StrategyKind};
pub use trade::{Trade, TradeAction, TradeRequest};
