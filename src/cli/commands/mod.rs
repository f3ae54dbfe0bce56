//! CLI command implementations.

pub mod auto;
pub mod portfolio;
pub mod replay;
pub mod signal;
pub mod strategy;
pub mod trade;
pub mod validate;
