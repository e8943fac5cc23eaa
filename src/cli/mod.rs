//! Command-line interface
//!
//! Argument parsing for the ledger binary. Each invocation loads the ledger
//! snapshot, runs one command and saves the snapshot back.

pub mod commands;

pub use commands::{Command, Opt};
