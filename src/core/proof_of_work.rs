use crate::core::{Block, Difficulty};
use crate::error::Result;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};

// Attempts between progress log lines
const PROGRESS_LOG_INTERVAL: u64 = 1_000_000;

/// Outcome of a successful nonce search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowSolution {
    pub hash: String,
    pub attempts: u64,
}

pub struct ProofOfWork {
    difficulty: Difficulty,
}

impl ProofOfWork {
    pub fn new_proof_of_work(difficulty: Difficulty) -> ProofOfWork {
        ProofOfWork { difficulty }
    }

    /// Checks a block's recorded hash against `difficulty`.
    pub fn validate(block: &Block, difficulty: Difficulty) -> bool {
        difficulty.is_satisfied_by(&block.hash())
    }

    /// Searches nonces until the block hash meets the target, then freezes it.
    ///
    /// `progress` is updated with the running attempt count so other threads
    /// can poll it while the search runs.
    pub fn run(&self, block: &mut Block, progress: &AtomicU64) -> Result<PowSolution> {
        let prefix = self.difficulty.target_prefix();
        info!(
            "Mining block with {} transactions, target prefix {prefix}",
            block.get_transactions().len()
        );

        let mut attempts: u64 = 0;
        loop {
            let hash = block.compute_hash();
            attempts += 1;
            progress.store(attempts, Ordering::Relaxed);

            if self.difficulty.is_satisfied_by(&hash) {
                block.freeze(hash.clone())?;
                info!("Found {hash} after {attempts} attempts");
                return Ok(PowSolution { hash, attempts });
            }

            if attempts % PROGRESS_LOG_INTERVAL == 0 {
                debug!("Still mining: {attempts} attempts so far");
            }
            block.advance_nonce()?;
        }
    }
}
