//! Error handling for the ledger
//!
//! Validation rejections and engine faults share one error type so callers
//! can propagate either with `?`. Rejections never mutate ledger state.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Key generation, signing or clock errors
    Crypto(String),
    /// Malformed transaction or signing misuse
    Transaction(String),
    /// Signature missing or not valid for the payer
    InvalidSignature(String),
    /// Payer cannot cover amount + fee
    InsufficientFunds { required: u64, available: u64 },
    /// Mempool at capacity and the newcomer's fee does not beat the lowest resident
    MempoolFull,
    /// Same canonical transaction already pending
    DuplicateTransaction,
    /// Block construction or chain-append errors
    InvalidBlock(String),
    /// Fault during a mining attempt
    Mining(String),
    /// Another mining attempt holds the mining slot
    MiningInProgress,
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
}

impl LedgerError {
    /// True for the caller-correctable rejections of transaction submission.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::Transaction(_)
                | LedgerError::InvalidSignature(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::MempoolFull
                | LedgerError::DuplicateTransaction
        )
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            LedgerError::InvalidSignature(msg) => write!(f, "Invalid signature: {msg}"),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::MempoolFull => write!(f, "Mempool is full"),
            LedgerError::DuplicateTransaction => write!(f, "Transaction is already pending"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            LedgerError::Mining(msg) => write!(f, "Mining error: {msg}"),
            LedgerError::MiningInProgress => write!(f, "A mining attempt is already in progress"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
