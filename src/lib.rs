//! # PoW Ledger - a single-node, in-memory proof-of-work ledger
//!
//! An append-only chain of blocks holding signed value transfers, secured
//! by a leading-zero-hex proof-of-work puzzle, with account balances derived
//! by replaying the chain.
//!
//! ## How the code is organized
//! - `core/`: transactions, blocks, proof-of-work and the [`Ledger`] engine
//! - `storage/`: the fee-priority memory pool and JSON snapshots
//! - `wallet/`: ECDSA P-256 accounts and the local keyring
//! - `config/`: engine parameters from defaults, TOML and the environment
//! - `utils/`: hashing, signing and bincode helpers
//! - `cli/`: command-line front end over the engine
//!
//! ## Flow
//! A caller builds and signs a [`Transaction`], submits it to the
//! [`Ledger`], which checks it against confirmed balances and queues it in
//! the [`MemoryPool`]. Mining drains the highest-priority transactions into
//! a new [`Block`], searches for a nonce meeting the difficulty, appends the
//! block and applies its balance changes in one step.
//!
//! ```no_run
//! use pow_ledger::{Ledger, LedgerConfig, Wallet};
//!
//! let ledger = Ledger::new(LedgerConfig::default()).unwrap();
//! let alice = Wallet::new().unwrap();
//!
//! // coinbase-only mining bootstraps funds
//! ledger.mine_block(&alice.get_address()).unwrap();
//!
//! let tx = alice.create_transaction("root", 10, 2).unwrap();
//! ledger.submit_transaction(tx).unwrap();
//! ledger.mine_block(&alice.get_address()).unwrap();
//! assert!(ledger.is_chain_valid());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Opt};
pub use config::LedgerConfig;
pub use core::{
    BalanceEntry, Block, BlockHash, ChainIssue, Difficulty, Ledger, LedgerEvent, MinedBlock,
    MiningHandle, ProofOfWork, Transaction, TransactionKind,
};
pub use error::{LedgerError, Result};
pub use storage::{load_from_file, save_to_file, LedgerSnapshot, MemoryPool};
pub use wallet::{validate_address, Wallet, Wallets, WALLET_FILE};
