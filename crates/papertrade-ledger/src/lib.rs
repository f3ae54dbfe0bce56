//! Ledger storage backends.
//!
//! Two implementations of the core store traits: an in-memory map for
//! tests and ephemeral runs, and a SQLite database for durable state.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
