//! Account keys and the local keyring
//!
//! Each account is one ECDSA P-256 key pair; its address is the hex-encoded
//! public key, which is what transaction verification decodes.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{validate_address, Wallet};
pub use wallets::{Wallets, WALLET_FILE};
