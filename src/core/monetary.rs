/// Ledger monetary constants
///
/// Amounts are whole integer units. Supply is created only by the genesis
/// transaction and by mining rewards; transfers move value without
/// creating or destroying any.
///
/// Identity credited by the genesis transaction
pub const ROOT_ADDRESS: &str = "root";

/// Units the genesis transaction credits to [`ROOT_ADDRESS`]
pub const GENESIS_AMOUNT: u64 = 100;

/// Synthetic payer tag of the genesis transaction
pub const GENESIS_PAYER: &str = "GENESIS";

/// Synthetic payer tag of mining reward transactions
pub const MINING_REWARD_PAYER: &str = "MINING_REWARD";

/// Fixed reward per mined block, before collected fees are added
pub const MINING_REWARD: u64 = 50;

/// Maximum number of mempool transactions drained into one block
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 10;

/// Default mempool capacity
pub const DEFAULT_MEMPOOL_CAPACITY: usize = 100;

/// Creation instant of the genesis block and its transaction (ms)
pub const GENESIS_TIMESTAMP: i64 = 0;

/// Reward for a block collecting `total_fees`
pub fn block_reward(base_reward: u64, total_fees: u64) -> u64 {
    base_reward.saturating_add(total_fees)
}
