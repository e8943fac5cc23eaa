// This is the ledger engine - the single owner of the chain, the mempool and the balances
// Balances are derived by replaying blocks, but incrementally: each mined block is
// applied once, under the same write lock that appends it, so readers never see
// a block without its balance changes
// Only one mining attempt may run at a time; submissions can keep flowing meanwhile

use crate::config::LedgerConfig;
use crate::core::events::{EventBus, LedgerEvent};
use crate::core::monetary::block_reward;
use crate::core::{Block, Difficulty, ProofOfWork, Transaction, TransactionKind};
use crate::error::{LedgerError, Result};
use crate::storage::{LedgerSnapshot, MemoryPool};
use crate::utils::current_timestamp;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Chain and balances change together, so they live behind one lock
struct ChainState {
    blocks: Vec<Block>,
    balances: HashMap<String, u64>,
}

/// A block appended by a successful mining attempt
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    pub height: usize,
    pub attempts: u64,
    pub elapsed: Duration,
}

/// One row of an address's balance history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub balance: u64,
    pub block_height: usize,
    pub timestamp: i64,
}

/// A problem found by [`Ledger::audit_chain`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIssue {
    MalformedGenesis,
    BrokenLink { height: usize },
    DifficultyNotMet { height: usize },
    HashMismatch { height: usize },
}

// Holds the single mining slot for as long as it lives
struct MiningSlot<'a> {
    flag: &'a AtomicBool,
}

impl<'a> MiningSlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<MiningSlot<'a>> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LedgerError::MiningInProgress)?;
        Ok(MiningSlot { flag })
    }

    // Leaves the flag set for a worker that will `adopt` it
    fn hand_off(self) {
        std::mem::forget(self);
    }

    // Guards a slot that a `hand_off` left claimed
    fn adopt(flag: &'a AtomicBool) -> MiningSlot<'a> {
        MiningSlot { flag }
    }
}

impl Drop for MiningSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Background mining attempt started by [`Ledger::spawn_mining`]
pub struct MiningHandle {
    handle: JoinHandle<Result<MinedBlock>>,
    ledger: Arc<Ledger>,
}

impl MiningHandle {
    /// Hashes tried so far by this attempt.
    pub fn attempts(&self) -> u64 {
        self.ledger.mining_attempts()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<MinedBlock> {
        self.handle
            .join()
            .map_err(|_| LedgerError::Mining("Mining thread panicked".to_string()))?
    }
}

pub struct Ledger {
    state: RwLock<ChainState>,
    mempool: MemoryPool,
    difficulty: AtomicU32,
    mining: AtomicBool,
    attempts: AtomicU64,
    config: LedgerConfig,
    events: EventBus,
}

impl Ledger {
    /// A fresh ledger holding only the genesis block.
    pub fn new(config: LedgerConfig) -> Result<Ledger> {
        config.validate()?;
        let genesis = Block::genesis();
        let mut balances = HashMap::new();
        for tx in genesis.get_transactions() {
            credit(&mut balances, tx.get_payee(), tx.get_amount())?;
        }

        info!("Created ledger with genesis block {}", genesis.hash());
        Ok(Self::from_parts(vec![genesis], balances, config, None))
    }

    /// Rebuilds a ledger from a snapshot, trusting stored hashes and balances.
    pub fn restore(snapshot: LedgerSnapshot, config: LedgerConfig) -> Result<Ledger> {
        config.validate()?;
        if snapshot.blocks.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Snapshot contains no blocks".to_string(),
            ));
        }

        let mut blocks = snapshot.blocks;
        for block in blocks.iter_mut().filter(|b| !b.is_frozen()) {
            let hash = block.compute_hash();
            block.freeze(hash)?;
        }
        let balances = snapshot.balances.into_iter().collect();

        info!("Restored ledger with {} blocks", blocks.len());
        Ok(Self::from_parts(
            blocks,
            balances,
            config,
            snapshot.difficulty,
        ))
    }

    fn from_parts(
        blocks: Vec<Block>,
        balances: HashMap<String, u64>,
        config: LedgerConfig,
        difficulty: Option<u32>,
    ) -> Ledger {
        let difficulty = Difficulty::new(difficulty.unwrap_or(config.difficulty));
        Ledger {
            state: RwLock::new(ChainState { blocks, balances }),
            mempool: MemoryPool::new(config.mempool_capacity),
            difficulty: AtomicU32::new(difficulty.value()),
            mining: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            config,
            events: EventBus::new(),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ChainState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ChainState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn subscribe(&self) -> Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Confirmed balance, 0 for unknown addresses.
    pub fn balance_of(&self, address: &str) -> u64 {
        self.read_state()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    pub fn balances(&self) -> BTreeMap<String, u64> {
        self.read_state()
            .balances
            .iter()
            .map(|(address, balance)| (address.clone(), *balance))
            .collect()
    }

    /// Sum of every confirmed balance.
    pub fn total_supply(&self) -> u128 {
        self.read_state()
            .balances
            .values()
            .map(|b| *b as u128)
            .sum()
    }

    /// Validates `tx` against confirmed balances and queues it in the mempool.
    ///
    /// Every `Err` is a rejection that leaves the ledger untouched.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        let result = self
            .validate_transaction(&tx)
            .and_then(|_| self.mempool.submit(tx.clone()));

        match &result {
            Ok(()) => {
                debug!(
                    "Accepted transaction {} -> {} ({} + fee {})",
                    tx.get_payer(),
                    tx.get_payee(),
                    tx.get_amount(),
                    tx.get_fee()
                );
                self.events.publish(LedgerEvent::Transaction {
                    payer: tx.get_payer().to_string(),
                    payee: tx.get_payee().to_string(),
                    amount: tx.get_amount(),
                    fee: tx.get_fee(),
                });
            }
            Err(e) => {
                debug!("Rejected transaction from {}: {e}", tx.get_payer());
                self.events.publish(LedgerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        if tx.get_amount() == 0 {
            return Err(LedgerError::Transaction(
                "Amount must be positive".to_string(),
            ));
        }

        // Supply-creating transactions skip signature and balance checks
        if tx.is_supply() {
            return Ok(());
        }

        if !tx.verify_payer() {
            return Err(LedgerError::InvalidSignature(format!(
                "Signature missing or invalid for payer {}",
                tx.get_payer()
            )));
        }

        let required = tx
            .total_cost()
            .ok_or_else(|| LedgerError::Transaction("Amount plus fee overflows".to_string()))?;
        let available = self.balance_of(tx.get_payer());
        if available < required {
            return Err(LedgerError::InsufficientFunds {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Mines the next block on the calling thread.
    ///
    /// Fails with [`LedgerError::MiningInProgress`] if another attempt holds
    /// the mining slot.
    pub fn mine_block(&self, miner_address: &str) -> Result<MinedBlock> {
        let _slot = MiningSlot::acquire(&self.mining)?;
        self.mine_in_slot(miner_address)
    }

    /// Mines the next block on a worker thread. The mining slot is claimed
    /// before this returns, so a concurrent request is rejected immediately.
    pub fn spawn_mining(self: &Arc<Self>, miner_address: &str) -> Result<MiningHandle> {
        // Claimed here so a second request fails before any thread exists
        let slot = MiningSlot::acquire(&self.mining)?;

        let ledger = Arc::clone(self);
        let miner = miner_address.to_string();
        let spawned = thread::Builder::new()
            .name("pow-miner".to_string())
            .spawn(move || {
                let _slot = MiningSlot::adopt(&ledger.mining);
                ledger.mine_in_slot(&miner)
            });

        match spawned {
            Ok(handle) => {
                slot.hand_off();
                Ok(MiningHandle {
                    handle,
                    ledger: Arc::clone(self),
                })
            }
            // dropping `slot` releases the claim
            Err(e) => Err(LedgerError::Mining(format!(
                "Failed to spawn mining thread: {e}"
            ))),
        }
    }

    pub fn is_mining(&self) -> bool {
        self.mining.load(Ordering::Acquire)
    }

    /// Attempt counter of the current (or most recent) mining attempt.
    pub fn mining_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn mine_in_slot(&self, miner_address: &str) -> Result<MinedBlock> {
        self.attempts.store(0, Ordering::Relaxed);
        // Drained transactions are committed to this attempt from here on
        let drained = self.mempool.drain(self.config.max_transactions_per_block);
        let drained_count = drained.len();

        let result = self.assemble_and_mine(miner_address, drained);
        if let Err(e) = &result {
            warn!("Mining attempt failed, {drained_count} drained transactions were dropped: {e}");
            self.events.publish(LedgerEvent::Error {
                message: e.to_string(),
            });
        }
        result
    }

    fn assemble_and_mine(
        &self,
        miner_address: &str,
        drained: Vec<Transaction>,
    ) -> Result<MinedBlock> {
        let started = Instant::now();
        let (previous_hash, height, selected) = {
            let state = self.read_state();
            let tip = state
                .blocks
                .last()
                .ok_or_else(|| LedgerError::Mining("Chain has no genesis block".to_string()))?;
            (
                tip.hash(),
                state.blocks.len(),
                select_spendable(drained, &state.balances),
            )
        };

        let total_fees = selected
            .iter()
            .fold(0u64, |acc, tx| acc.saturating_add(tx.get_fee()));
        let reward_amount = block_reward(self.config.mining_reward, total_fees);
        info!(
            "Mining block {height} with {} transactions, {total_fees} in fees",
            selected.len()
        );

        let mut transactions = selected;
        transactions.push(Transaction::new_reward(miner_address, reward_amount)?);
        let transaction_count = transactions.len();
        let mut block = Block::new_block(&previous_hash, transactions, miner_address)?;

        self.events.publish(LedgerEvent::MiningStarted {
            miner: miner_address.to_string(),
            height,
            transactions: transaction_count,
        });

        let difficulty = self.difficulty();
        let solution = ProofOfWork::new_proof_of_work(difficulty).run(&mut block, &self.attempts)?;

        {
            let mut state = self.write_state();
            let tip_hash = state.blocks.last().map(Block::hash).unwrap_or_default();
            if tip_hash != previous_hash {
                return Err(LedgerError::Mining(format!(
                    "Chain tip moved from {previous_hash} to {tip_hash} during mining"
                )));
            }

            // Stage every balance change first so a failure leaves nothing half-applied
            let staged = stage_balance_changes(&state.balances, &block)?;
            state.blocks.push(block.clone());
            state.balances.extend(staged);
        }

        let elapsed = started.elapsed();
        info!(
            "Mined block {height}: {} (difficulty {difficulty}, {} attempts, {} ms)",
            solution.hash,
            solution.attempts,
            elapsed.as_millis()
        );
        self.events.publish(LedgerEvent::MiningCompleted {
            height,
            hash: solution.hash,
            attempts: solution.attempts,
            elapsed_ms: elapsed.as_millis(),
        });

        Ok(MinedBlock {
            block,
            height,
            attempts: solution.attempts,
            elapsed,
        })
    }

    /// Checks every link and every non-genesis hash against the current difficulty.
    ///
    /// Difficulty is global, so raising it can make blocks mined under a lower
    /// value fail this check.
    pub fn is_chain_valid(&self) -> bool {
        let difficulty = self.difficulty();
        let state = self.read_state();
        state.blocks.windows(2).all(|pair| {
            pair[1].get_previous_hash() == pair[0].hash()
                && difficulty.is_satisfied_by(&pair[1].hash())
        })
    }

    /// Every integrity problem in the chain, including stored hashes that do
    /// not match block contents.
    pub fn audit_chain(&self) -> Vec<ChainIssue> {
        let difficulty = self.difficulty();
        let state = self.read_state();
        let mut issues = Vec::new();

        let genesis_ok = state.blocks.first().is_some_and(|genesis| {
            genesis.get_previous_hash().is_empty()
                && genesis.get_transactions().len() == 1
                && genesis.get_transactions()[0].get_kind() == TransactionKind::Genesis
        });
        if !genesis_ok {
            issues.push(ChainIssue::MalformedGenesis);
        }

        for (height, block) in state.blocks.iter().enumerate() {
            if block.hash() != block.compute_hash() {
                issues.push(ChainIssue::HashMismatch { height });
            }
            if height == 0 {
                continue;
            }
            if block.get_previous_hash() != state.blocks[height - 1].hash() {
                issues.push(ChainIssue::BrokenLink { height });
            }
            if !difficulty.is_satisfied_by(&block.hash()) {
                issues.push(ChainIssue::DifficultyNotMet { height });
            }
        }
        issues
    }

    /// Balance of `address` after each block, replayed from genesis.
    pub fn balance_history(&self, address: &str) -> Vec<BalanceEntry> {
        let state = self.read_state();
        let mut balance: u64 = 0;
        state
            .blocks
            .iter()
            .enumerate()
            .map(|(block_height, block)| {
                for tx in block.get_transactions() {
                    if !tx.is_supply() && tx.get_payer() == address {
                        balance = balance.saturating_sub(tx.get_amount().saturating_add(tx.get_fee()));
                    }
                    if tx.get_payee() == address {
                        balance = balance.saturating_add(tx.get_amount());
                    }
                }
                BalanceEntry {
                    balance,
                    block_height,
                    timestamp: block.get_timestamp(),
                }
            })
            .collect()
    }

    pub fn chain(&self) -> Vec<Block> {
        self.read_state().blocks.clone()
    }

    pub fn block_at(&self, height: usize) -> Option<Block> {
        self.read_state().blocks.get(height).cloned()
    }

    pub fn tip_hash(&self) -> String {
        self.read_state()
            .blocks
            .last()
            .map(Block::hash)
            .unwrap_or_default()
    }

    pub fn chain_length(&self) -> usize {
        self.read_state().blocks.len()
    }

    pub fn pending_count(&self) -> usize {
        self.mempool.len()
    }

    /// Pending transactions in priority order.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.mempool.get_all()
    }

    pub fn is_pending(&self, tx: &Transaction) -> bool {
        self.mempool.contains(tx)
    }

    pub fn clear_pending(&self) {
        self.mempool.clear();
    }

    pub fn difficulty(&self) -> Difficulty {
        Difficulty::new(self.difficulty.load(Ordering::Acquire))
    }

    /// Clamps to [1,8]; existing blocks are not re-mined.
    pub fn set_difficulty(&self, value: u32) -> Difficulty {
        let difficulty = Difficulty::new(value);
        self.difficulty.store(difficulty.value(), Ordering::Release);
        info!("Difficulty set to {difficulty}");
        difficulty
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let saved_at = current_timestamp()?;
        let state = self.read_state();
        Ok(LedgerSnapshot {
            blocks: state.blocks.clone(),
            balances: state
                .balances
                .iter()
                .map(|(address, balance)| (address.clone(), *balance))
                .collect(),
            saved_at,
            difficulty: Some(self.difficulty().value()),
        })
    }
}

// Keeps drained transactions the payers can still afford, in order. Two pending
// spends of the same funds both pass admission; the later one is dropped here.
fn select_spendable(drained: Vec<Transaction>, balances: &HashMap<String, u64>) -> Vec<Transaction> {
    let mut running: HashMap<String, u64> = HashMap::new();
    let mut selected = Vec::with_capacity(drained.len());

    for tx in drained {
        if tx.is_supply() {
            let payee = running
                .entry(tx.get_payee().to_string())
                .or_insert_with(|| balances.get(tx.get_payee()).copied().unwrap_or_default());
            *payee = payee.saturating_add(tx.get_amount());
            selected.push(tx);
            continue;
        }

        let available = running
            .get(tx.get_payer())
            .copied()
            .unwrap_or_else(|| balances.get(tx.get_payer()).copied().unwrap_or_default());
        let cost = tx.total_cost().unwrap_or(u64::MAX);
        if available < cost {
            warn!(
                "Dropping transaction from {}: needs {cost}, only {available} left in this block",
                tx.get_payer()
            );
            continue;
        }

        running.insert(tx.get_payer().to_string(), available - cost);
        let payee = running
            .entry(tx.get_payee().to_string())
            .or_insert_with(|| balances.get(tx.get_payee()).copied().unwrap_or_default());
        *payee = payee.saturating_add(tx.get_amount());
        selected.push(tx);
    }
    selected
}

// New balances of every account a block touches, computed without mutating `balances`
fn stage_balance_changes(
    balances: &HashMap<String, u64>,
    block: &Block,
) -> Result<HashMap<String, u64>> {
    let mut staged: HashMap<String, u64> = HashMap::new();

    for tx in block.get_transactions() {
        if tx.get_kind() == TransactionKind::Regular {
            let cost = tx
                .total_cost()
                .ok_or_else(|| LedgerError::InvalidBlock("Amount plus fee overflows".to_string()))?;
            let current = staged
                .get(tx.get_payer())
                .or_else(|| balances.get(tx.get_payer()))
                .copied()
                .unwrap_or_default();
            let debited = current.checked_sub(cost).ok_or_else(|| {
                LedgerError::InvalidBlock(format!(
                    "Payer {} cannot cover {cost} (balance {current})",
                    tx.get_payer()
                ))
            })?;
            staged.insert(tx.get_payer().to_string(), debited);
        }

        let current = staged
            .get(tx.get_payee())
            .or_else(|| balances.get(tx.get_payee()))
            .copied()
            .unwrap_or_default();
        let credited = current.checked_add(tx.get_amount()).ok_or_else(|| {
            LedgerError::InvalidBlock(format!("Balance overflow crediting {}", tx.get_payee()))
        })?;
        staged.insert(tx.get_payee().to_string(), credited);
    }
    Ok(staged)
}

fn credit(balances: &mut HashMap<String, u64>, address: &str, amount: u64) -> Result<()> {
    let balance = balances.entry(address.to_string()).or_default();
    *balance = balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidBlock(format!("Balance overflow crediting {address}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::monetary::ROOT_ADDRESS;
    use crate::testnet::{create_test_ledger, funded_wallet, test_config};
    use crate::wallet::Wallet;

    #[test]
    fn test_genesis_state() {
        let ledger = create_test_ledger().unwrap();
        assert_eq!(ledger.chain_length(), 1);
        assert_eq!(ledger.balance_of(ROOT_ADDRESS), 100);
        assert!(ledger.is_chain_valid());
        assert_eq!(ledger.pending_count(), 0);
        assert!(ledger.audit_chain().is_empty());
    }

    #[test]
    fn test_coinbase_only_mining() {
        let ledger = create_test_ledger().unwrap();
        let mined = ledger.mine_block("miner").unwrap();

        assert_eq!(mined.height, 1);
        assert!(mined.attempts >= 1);
        assert_eq!(mined.block.get_transactions().len(), 1);
        let reward = mined.block.get_reward().unwrap();
        assert_eq!(reward.get_kind(), TransactionKind::Reward);
        assert_eq!(reward.get_amount(), 50);
        assert_eq!(ledger.balance_of("miner"), 50);
        assert_eq!(ledger.chain_length(), 2);
    }

    #[test]
    fn test_transfer_moves_value_and_pays_fees() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        let bob = Wallet::new().unwrap();

        let tx = alice.create_transaction(&bob.get_address(), 20, 3).unwrap();
        ledger.submit_transaction(tx.clone()).unwrap();
        assert_eq!(ledger.pending_count(), 1);
        assert!(ledger.is_pending(&tx));
        // pending transfers do not touch confirmed balances
        assert_eq!(ledger.balance_of(&alice.get_address()), 50);

        let mined = ledger.mine_block("miner").unwrap();
        assert_eq!(mined.block.get_transactions().len(), 2);
        assert_eq!(mined.block.get_reward().unwrap().get_amount(), 53);
        assert_eq!(ledger.balance_of(&alice.get_address()), 27);
        assert_eq!(ledger.balance_of(&bob.get_address()), 20);
        assert_eq!(ledger.balance_of("miner"), 53);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_rejects_insufficient_funds_without_mutation() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();

        let tx = alice.create_transaction("bob", 49, 2).unwrap();
        let result = ledger.submit_transaction(tx);

        assert_eq!(
            result,
            Err(LedgerError::InsufficientFunds {
                required: 51,
                available: 50
            })
        );
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_rejects_unsigned_and_forged() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        let mallory = Wallet::new().unwrap();

        let unsigned = Transaction::new_regular(5, &alice.get_address(), "bob", 0).unwrap();
        assert!(matches!(
            ledger.submit_transaction(unsigned),
            Err(LedgerError::InvalidSignature(_))
        ));

        let mut forged = Transaction::new_regular(5, &alice.get_address(), "bob", 0).unwrap();
        forged.sign(mallory.get_pkcs8()).unwrap();
        assert!(matches!(
            ledger.submit_transaction(forged),
            Err(LedgerError::InvalidSignature(_))
        ));

        let zero = Transaction::new_regular(0, &alice.get_address(), "bob", 0).unwrap();
        assert!(matches!(
            ledger.submit_transaction(zero),
            Err(LedgerError::Transaction(_))
        ));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_supply_transactions_bypass_checks() {
        let ledger = create_test_ledger().unwrap();
        let reward = Transaction::new_reward("lucky", 5).unwrap();
        ledger.submit_transaction(reward).unwrap();

        ledger.mine_block("miner").unwrap();
        assert_eq!(ledger.balance_of("lucky"), 5);
        assert_eq!(ledger.total_supply(), 100 + 5 + 50);
    }

    #[test]
    fn test_overdraft_across_pending_is_dropped_at_mining() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();

        // each passes admission against the confirmed 50, together they overdraw
        ledger
            .submit_transaction(alice.create_transaction("bob", 30, 2).unwrap())
            .unwrap();
        ledger
            .submit_transaction(alice.create_transaction("carol", 30, 1).unwrap())
            .unwrap();

        let mined = ledger.mine_block("miner").unwrap();
        assert_eq!(mined.block.get_transactions().len(), 2);
        assert_eq!(ledger.balance_of("bob"), 30);
        assert_eq!(ledger.balance_of("carol"), 0);
        assert_eq!(ledger.balance_of(&alice.get_address()), 18);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_block_size_limit() {
        let config = LedgerConfig {
            max_transactions_per_block: 2,
            ..test_config()
        };
        let ledger = Ledger::new(config).unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        for fee in 1..=3 {
            ledger
                .submit_transaction(alice.create_transaction("bob", 1, fee).unwrap())
                .unwrap();
        }

        let mined = ledger.mine_block("miner").unwrap();
        assert_eq!(mined.block.get_transactions().len(), 3);
        let fees: Vec<u64> = mined.block.get_transactions()[..2]
            .iter()
            .map(|tx| tx.get_fee())
            .collect();
        assert_eq!(fees, vec![3, 2]);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_conservation() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        let bob = funded_wallet(&ledger).unwrap();

        ledger
            .submit_transaction(alice.create_transaction(&bob.get_address(), 10, 4).unwrap())
            .unwrap();
        ledger
            .submit_transaction(bob.create_transaction(ROOT_ADDRESS, 7, 1).unwrap())
            .unwrap();
        ledger.mine_block(&alice.get_address()).unwrap();

        let rewards: u128 = ledger
            .chain()
            .iter()
            .flat_map(|b| b.get_transactions().iter())
            .filter(|tx| tx.get_kind() == TransactionKind::Reward)
            .map(|tx| tx.get_amount() as u128)
            .sum();
        assert_eq!(ledger.total_supply(), 100 + rewards);
    }

    #[test]
    fn test_chain_links_and_difficulty() {
        let ledger = create_test_ledger().unwrap();
        ledger.set_difficulty(2);
        for _ in 0..3 {
            ledger.mine_block("miner").unwrap();
        }

        let chain = ledger.chain();
        for pair in chain.windows(2) {
            assert_eq!(pair[1].get_previous_hash(), pair[0].hash());
            assert!(pair[1].hash().starts_with("00"));
            assert!(pair[1].is_frozen());
        }
        assert!(ledger.is_chain_valid());
        assert_eq!(ledger.tip_hash(), chain[3].hash());
    }

    #[test]
    fn test_raising_difficulty_can_invalidate_history() {
        let ledger = create_test_ledger().unwrap();
        ledger.set_difficulty(1);
        let mined = ledger.mine_block("miner").unwrap();

        let zeros = mined.block.hash().bytes().take_while(|b| *b == b'0').count() as u32;
        if zeros < 8 {
            ledger.set_difficulty(zeros + 1);
            assert!(!ledger.is_chain_valid());
            assert!(ledger
                .audit_chain()
                .contains(&ChainIssue::DifficultyNotMet { height: 1 }));
        }
    }

    #[test]
    fn test_set_difficulty_clamps() {
        let ledger = create_test_ledger().unwrap();
        assert_eq!(ledger.set_difficulty(0).value(), 1);
        assert_eq!(ledger.set_difficulty(99).value(), 8);
        assert_eq!(ledger.difficulty().value(), 8);
    }

    #[test]
    fn test_balance_history() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        ledger
            .submit_transaction(alice.create_transaction("bob", 15, 5).unwrap())
            .unwrap();
        ledger.mine_block("miner").unwrap();

        let history = ledger.balance_history(&alice.get_address());
        let balances: Vec<u64> = history.iter().map(|e| e.balance).collect();
        let heights: Vec<usize> = history.iter().map(|e| e.block_height).collect();
        assert_eq!(balances, vec![0, 50, 30]);
        assert_eq!(heights, vec![0, 1, 2]);
        assert_eq!(history[2].timestamp, ledger.chain()[2].get_timestamp());

        let root = ledger.balance_history(ROOT_ADDRESS);
        assert!(root.iter().all(|e| e.balance == 100));
    }

    #[test]
    fn test_second_mining_request_rejected_while_busy() {
        let ledger = create_test_ledger().unwrap();
        let _slot = MiningSlot::acquire(&ledger.mining).unwrap();

        assert!(ledger.is_mining());
        assert!(matches!(
            ledger.mine_block("miner"),
            Err(LedgerError::MiningInProgress)
        ));
        assert_eq!(ledger.chain_length(), 1);
    }

    #[test]
    fn test_mining_slot_released_after_mining() {
        let ledger = create_test_ledger().unwrap();
        ledger.mine_block("miner").unwrap();
        assert!(!ledger.is_mining());
        ledger.mine_block("miner").unwrap();
        assert_eq!(ledger.chain_length(), 3);
    }

    #[test]
    fn test_spawn_mining_in_background() {
        let ledger = Arc::new(create_test_ledger().unwrap());
        let handle = ledger.spawn_mining("miner").unwrap();
        let mined = handle.join().unwrap();

        assert!(mined.attempts >= 1);
        assert_eq!(ledger.mining_attempts(), mined.attempts);
        assert_eq!(ledger.balance_of("miner"), 50);
        assert!(!ledger.is_mining());
    }

    #[test]
    fn test_spawn_rejected_when_slot_taken() {
        let ledger = Arc::new(create_test_ledger().unwrap());
        let _slot = MiningSlot::acquire(&ledger.mining).unwrap();
        assert!(matches!(
            ledger.spawn_mining("miner"),
            Err(LedgerError::MiningInProgress)
        ));
    }

    #[test]
    fn test_events_are_published() {
        let ledger = create_test_ledger().unwrap();
        let events = ledger.subscribe();
        let alice = funded_wallet(&ledger).unwrap();
        ledger
            .submit_transaction(alice.create_transaction("bob", 1, 1).unwrap())
            .unwrap();
        let _ = ledger.submit_transaction(alice.create_transaction("bob", 500, 1).unwrap());

        let received: Vec<LedgerEvent> = events.try_iter().collect();
        assert!(matches!(received[0], LedgerEvent::MiningStarted { height: 1, .. }));
        assert!(matches!(received[1], LedgerEvent::MiningCompleted { height: 1, .. }));
        assert!(matches!(received[2], LedgerEvent::Transaction { amount: 1, fee: 1, .. }));
        assert!(matches!(received[3], LedgerEvent::Error { .. }));
    }

    #[test]
    fn test_snapshot_restore() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        ledger.set_difficulty(2);

        let snapshot = ledger.snapshot().unwrap();
        assert_eq!(snapshot.difficulty, Some(2));
        let restored = Ledger::restore(snapshot, test_config()).unwrap();

        assert_eq!(restored.chain_length(), 2);
        assert_eq!(restored.balance_of(&alice.get_address()), 50);
        assert_eq!(restored.balance_of(ROOT_ADDRESS), 100);
        assert_eq!(restored.tip_hash(), ledger.tip_hash());
        assert_eq!(restored.difficulty().value(), 2);
        assert_eq!(restored.pending_count(), 0);
    }

    #[test]
    fn test_restore_rejects_empty_snapshot() {
        let snapshot = LedgerSnapshot {
            blocks: vec![],
            balances: BTreeMap::new(),
            saved_at: 0,
            difficulty: None,
        };
        assert!(Ledger::restore(snapshot, test_config()).is_err());
    }

    #[test]
    fn test_audit_detects_tampering() {
        let ledger = create_test_ledger().unwrap();
        ledger.mine_block("miner").unwrap();
        let mut snapshot = ledger.snapshot().unwrap();

        // rewrite the mined block's contents while keeping its stored hash
        let original = snapshot.blocks[1].clone();
        let mut json = serde_json::to_value(&original).unwrap();
        json["minerAddress"] = serde_json::Value::from("thief");
        snapshot.blocks[1] = serde_json::from_value(json).unwrap();

        let restored = Ledger::restore(snapshot, test_config()).unwrap();
        // links and difficulty only look at stored hashes
        assert!(restored.is_chain_valid());
        assert_eq!(
            restored.audit_chain(),
            vec![ChainIssue::HashMismatch { height: 1 }]
        );
    }

    fn transaction_from_json(value: serde_json::Value) -> Transaction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extreme_timestamps_are_admitted() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();

        let mut ancient = transaction_from_json(serde_json::json!({
            "amount": 5, "payer": alice.get_address(), "payee": "bob",
            "fee": 1, "timestamp": i64::MIN, "kind": "REGULAR"
        }));
        ancient.sign(alice.get_pkcs8()).unwrap();
        let future_reward = transaction_from_json(serde_json::json!({
            "amount": 5, "payer": "MINING_REWARD", "payee": "lucky",
            "fee": 0, "timestamp": i64::MAX, "kind": "REWARD"
        }));

        ledger.submit_transaction(ancient).unwrap();
        ledger.submit_transaction(future_reward).unwrap();
        assert_eq!(ledger.pending_count(), 2);
    }

    #[test]
    fn test_zero_amount_supply_rejected() {
        let ledger = create_test_ledger().unwrap();
        let empty_reward = transaction_from_json(serde_json::json!({
            "amount": 0, "payer": "MINING_REWARD", "payee": "lucky",
            "fee": 0, "timestamp": 1, "kind": "REWARD"
        }));

        assert!(matches!(
            ledger.submit_transaction(empty_reward),
            Err(LedgerError::Transaction(_))
        ));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_snapshot_without_kinds_restores_supply_transactions() {
        let ledger = create_test_ledger().unwrap();
        let alice = funded_wallet(&ledger).unwrap();
        ledger
            .submit_transaction(alice.create_transaction("bob", 5, 1).unwrap())
            .unwrap();
        ledger.mine_block("miner").unwrap();

        let mut json = serde_json::to_value(ledger.snapshot().unwrap()).unwrap();
        for block in json["blocks"].as_array_mut().unwrap() {
            for tx in block["transactions"].as_array_mut().unwrap() {
                tx.as_object_mut().unwrap().remove("kind");
            }
        }
        let snapshot: LedgerSnapshot = serde_json::from_value(json).unwrap();
        let restored = Ledger::restore(snapshot, test_config()).unwrap();

        let kinds: Vec<TransactionKind> = restored
            .chain()
            .iter()
            .flat_map(|b| b.get_transactions().iter().map(|tx| tx.get_kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Genesis,
                TransactionKind::Reward,
                TransactionKind::Regular,
                TransactionKind::Reward,
            ]
        );
        assert!(restored.is_chain_valid());
        assert!(restored.audit_chain().is_empty());
    }

    #[test]
    fn test_handed_off_slot_stays_claimed_until_adopted_guard_drops() {
        let ledger = create_test_ledger().unwrap();
        MiningSlot::acquire(&ledger.mining).unwrap().hand_off();
        assert!(ledger.is_mining());
        assert!(MiningSlot::acquire(&ledger.mining).is_err());

        drop(MiningSlot::adopt(&ledger.mining));
        assert!(!ledger.is_mining());
        assert!(MiningSlot::acquire(&ledger.mining).is_ok());
    }
}
