//! Core ledger functionality
//!
//! Transactions, blocks, proof-of-work, difficulty and the ledger engine
//! that ties them to the mempool and the balance table.

pub mod block;
pub mod difficulty;
pub mod events;
pub mod ledger;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, BlockHash};
pub use difficulty::Difficulty;
pub use events::{EventBus, LedgerEvent};
pub use ledger::{BalanceEntry, ChainIssue, Ledger, MinedBlock, MiningHandle};
pub use monetary::{GENESIS_AMOUNT, MAX_TRANSACTIONS_PER_BLOCK, MINING_REWARD, ROOT_ADDRESS};
pub use proof_of_work::{PowSolution, ProofOfWork};
pub use transaction::{Transaction, TransactionKind};
