//! Core types and traits for the virtual trading engine.
//!
//! This crate provides the foundational building blocks including:
//! - Ledger record types (Portfolio, Position, Trade, Strategy, Signal)
//! - Auto-trading run reports
//! - Boundary traits for price sources, signal sources, and the ledger store
//! - The engine error taxonomy with HTTP-equivalent status mapping

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DataError, EngineError, EngineResult, LedgerError};
pub use traits::*;
pub use types::*;
