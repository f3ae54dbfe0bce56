//! Boundary traits for the trading engine.

mod ledger;
mod price_source;
mod signal_source;

pub use ledger::{LedgerStore, SignalStore};
pub use price_source::PriceSource;
pub use signal_source::SignalSource;
