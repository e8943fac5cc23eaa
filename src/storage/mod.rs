//! Data storage and persistence
//!
//! The memory pool for pending transactions and the JSON snapshot format
//! the ledger is saved to and restored from.

pub mod memory_pool;
pub mod snapshot;

pub use memory_pool::{priority_score, MemoryPool};
pub use snapshot::{load_from_file, save_to_file, LedgerSnapshot};
