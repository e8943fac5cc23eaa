//! Test utilities for ledger testing

use crate::config::LedgerConfig;
use crate::core::Ledger;
use crate::error::Result;
use crate::wallet::Wallet;

/// Config tuned for fast tests: easiest difficulty, small mempool
pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        difficulty: 1,
        mempool_capacity: 16,
        ..LedgerConfig::default()
    }
}

pub fn create_test_ledger() -> Result<Ledger> {
    Ledger::new(test_config())
}

pub fn create_test_wallets(count: usize) -> Result<Vec<Wallet>> {
    (0..count).map(|_| Wallet::new()).collect()
}

/// A new wallet credited with one block reward by coinbase-only mining.
pub fn funded_wallet(ledger: &Ledger) -> Result<Wallet> {
    let wallet = Wallet::new()?;
    ledger.mine_block(&wallet.get_address())?;
    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funded_wallet_has_reward() {
        let ledger = create_test_ledger().unwrap();
        let wallet = funded_wallet(&ledger).unwrap();
        assert_eq!(ledger.balance_of(&wallet.get_address()), 50);
        assert_eq!(ledger.chain_length(), 2);
    }

    #[test]
    fn test_create_test_wallets_are_distinct() {
        let wallets = create_test_wallets(3).unwrap();
        assert_eq!(wallets.len(), 3);
        assert_ne!(wallets[0].get_address(), wallets[1].get_address());
    }
}
