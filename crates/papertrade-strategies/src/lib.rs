//! Strategy evaluation for automatic trading.
//!
//! `AutoTradingEvaluator` resolves a portfolio's strategies, routes each
//! symbol to the signal source its strategy kind selects, and sizes and
//! executes trades through the engine. Results come back as a structured
//! run report rather than a hard failure wherever possible.

mod evaluator;
mod router;

pub use evaluator::{AutoTradingEvaluator, RunRequest};
pub use router::SignalRouter;
