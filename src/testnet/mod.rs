//! Test fixtures for ledger testing
//!
//! Fast-difficulty ledgers and wallets funded through coinbase-only mining.

pub mod test_utils;

pub use test_utils::*;
