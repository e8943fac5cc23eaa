use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::current_timestamp;
use log::{debug, info};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// `fee * 1000 / (age_seconds + 1)`, the mempool ordering score.
pub fn priority_score(fee: u64, age_seconds: f64) -> f64 {
    fee as f64 * 1000.0 / (age_seconds.max(0.0) + 1.0)
}

#[derive(Debug, Clone)]
struct PoolEntry {
    transaction: Transaction,
    canonical: Vec<u8>,
    // snapshot taken at insertion, never recomputed
    priority: f64,
}

/// Pending transactions, kept sorted by descending priority.
///
/// Bounded by `capacity`; a full pool only admits a newcomer whose fee is
/// strictly greater than the fee of its lowest-priority resident, which is
/// then evicted.
pub struct MemoryPool {
    inner: RwLock<Vec<PoolEntry>>,
    capacity: usize,
}

impl MemoryPool {
    pub fn new(capacity: usize) -> MemoryPool {
        MemoryPool {
            inner: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    // A panic while holding the lock leaves the entries intact, so keep using them
    fn read_pool(&self) -> RwLockReadGuard<'_, Vec<PoolEntry>> {
        match self.inner.read() {
            Ok(pool) => pool,
            Err(poisoned) => {
                log::error!("Memory pool lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_pool(&self) -> RwLockWriteGuard<'_, Vec<PoolEntry>> {
        match self.inner.write() {
            Ok(pool) => pool,
            Err(poisoned) => {
                log::error!("Memory pool lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Admits `tx`, scoring it against the current clock.
    pub fn submit(&self, tx: Transaction) -> Result<()> {
        let now = current_timestamp().unwrap_or_else(|_| tx.get_timestamp());
        self.submit_at(tx, now)
    }

    /// Admits `tx` as if the clock read `now_ms`.
    pub fn submit_at(&self, tx: Transaction, now_ms: i64) -> Result<()> {
        let canonical = tx.canonical_bytes()?;
        let age_seconds = now_ms.saturating_sub(tx.get_timestamp()) as f64 / 1000.0;
        let entry = PoolEntry {
            priority: priority_score(tx.get_fee(), age_seconds),
            transaction: tx,
            canonical,
        };

        let mut pool = self.write_pool();

        if pool.iter().any(|e| e.canonical == entry.canonical) {
            return Err(LedgerError::DuplicateTransaction);
        }

        if pool.len() >= self.capacity {
            let lowest_fee = pool
                .last()
                .map(|e| e.transaction.get_fee())
                .unwrap_or_default();
            if entry.transaction.get_fee() <= lowest_fee {
                debug!(
                    "Mempool full ({} entries), rejecting fee {} (lowest resident fee {lowest_fee})",
                    pool.len(),
                    entry.transaction.get_fee()
                );
                return Err(LedgerError::MempoolFull);
            }
            if let Some(evicted) = pool.pop() {
                info!(
                    "Evicted pending transaction with fee {} (priority {:.2})",
                    evicted.transaction.get_fee(),
                    evicted.priority
                );
            }
        }

        pool.push(entry);
        // stable, so equal scores keep arrival order
        pool.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        Ok(())
    }

    /// Removes up to `max_count` transactions from the high-priority end.
    pub fn drain(&self, max_count: usize) -> Vec<Transaction> {
        let mut pool = self.write_pool();
        let count = max_count.min(pool.len());
        pool.drain(..count).map(|e| e.transaction).collect()
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        let Ok(canonical) = tx.canonical_bytes() else {
            return false;
        };
        self.read_pool().iter().any(|e| e.canonical == canonical)
    }

    pub fn len(&self) -> usize {
        self.read_pool().len()
    }

    /// Snapshot of all pending transactions in priority order.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.read_pool()
            .iter()
            .map(|e| e.transaction.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.write_pool().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
