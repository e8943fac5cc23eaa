use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, sha256_hex};
use serde::{Deserialize, Serialize};

/// A block's hash is computed on demand until the block is mined, then frozen.
///
/// The frozen value is authoritative: chain links and validity checks read
/// it, and a frozen block refuses further nonce changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockHash {
    Pending,
    Frozen(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BlockRecord", from = "BlockRecord")]
pub struct Block {
    previous_hash: String,
    transactions: Vec<Transaction>,
    miner_address: String,
    timestamp: i64,
    nonce: u64,
    hash: BlockHash,
}

// Persisted shape: the hash is always written out and re-trusted on load
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockRecord {
    previous_hash: String,
    transactions: Vec<Transaction>,
    timestamp: i64,
    nonce: u64,
    miner_address: String,
    hash: String,
}

impl From<Block> for BlockRecord {
    fn from(block: Block) -> Self {
        let hash = block.hash();
        BlockRecord {
            previous_hash: block.previous_hash,
            transactions: block.transactions,
            timestamp: block.timestamp,
            nonce: block.nonce,
            miner_address: block.miner_address,
            hash,
        }
    }
}

impl From<BlockRecord> for Block {
    fn from(record: BlockRecord) -> Self {
        Block {
            previous_hash: record.previous_hash,
            transactions: record.transactions,
            miner_address: record.miner_address,
            timestamp: record.timestamp,
            nonce: record.nonce,
            hash: BlockHash::Frozen(record.hash),
        }
    }
}

impl Block {
    /// Candidate block on top of `previous_hash`, starting from a random nonce.
    pub fn new_block(
        previous_hash: &str,
        transactions: Vec<Transaction>,
        miner_address: &str,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        Ok(Block {
            previous_hash: previous_hash.to_string(),
            transactions,
            miner_address: miner_address.to_string(),
            timestamp: current_timestamp()?,
            nonce: rand::random::<u32>() as u64,
            hash: BlockHash::Pending,
        })
    }

    /// The genesis block: no predecessor, one GENESIS transaction, fixed fields.
    /// Its hash is frozen immediately; it is never subject to proof-of-work.
    pub fn genesis() -> Block {
        let genesis_tx = Transaction::new_genesis();
        let mut block = Block {
            previous_hash: String::new(),
            timestamp: genesis_tx.get_timestamp(),
            transactions: vec![genesis_tx],
            miner_address: String::new(),
            nonce: 0,
            hash: BlockHash::Pending,
        };
        let hash = block.compute_hash();
        block.hash = BlockHash::Frozen(hash);
        block
    }

    #[cfg(test)]
    pub(crate) fn new_test_block(
        previous_hash: &str,
        transactions: Vec<Transaction>,
        miner_address: &str,
        timestamp: i64,
        nonce: u64,
    ) -> Block {
        Block {
            previous_hash: previous_hash.to_string(),
            transactions,
            miner_address: miner_address.to_string(),
            timestamp,
            nonce,
            hash: BlockHash::Pending,
        }
    }

    fn hash_input(&self) -> Vec<u8> {
        let mut data = vec![];
        push_field(&mut data, self.previous_hash.as_bytes());
        data.extend((self.transactions.len() as u64).to_be_bytes());
        for tx in &self.transactions {
            // canonical bytes are pure encoding of owned fields
            let body = tx.canonical_bytes().unwrap_or_default();
            push_field(&mut data, &body);
            push_field(&mut data, tx.get_signature().unwrap_or_default());
        }
        data.extend(self.timestamp.to_be_bytes());
        data.extend(self.nonce.to_be_bytes());
        push_field(&mut data, self.miner_address.as_bytes());
        data
    }

    /// Digest over {previous hash, transactions, timestamp, nonce, miner},
    /// ignoring any frozen value.
    pub fn compute_hash(&self) -> String {
        sha256_hex(&self.hash_input())
    }

    /// The frozen hash if there is one, otherwise a freshly computed digest.
    pub fn hash(&self) -> String {
        match &self.hash {
            BlockHash::Frozen(hash) => hash.clone(),
            BlockHash::Pending => self.compute_hash(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.hash, BlockHash::Frozen(_))
    }

    /// Advances the nonce by one. When the nonce space wraps, the timestamp
    /// is bumped by a millisecond so the search continues over fresh inputs.
    pub fn advance_nonce(&mut self) -> Result<()> {
        self.ensure_pending()?;
        self.nonce = self.nonce.wrapping_add(1);
        if self.nonce == 0 {
            self.timestamp += 1;
        }
        Ok(())
    }

    pub fn set_nonce(&mut self, nonce: u64) -> Result<()> {
        self.ensure_pending()?;
        self.nonce = nonce;
        Ok(())
    }

    /// Records `hash` as the block's permanent hash.
    pub fn freeze(&mut self, hash: String) -> Result<()> {
        self.ensure_pending()?;
        self.hash = BlockHash::Frozen(hash);
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        if let BlockHash::Frozen(hash) = &self.hash {
            return Err(LedgerError::InvalidBlock(format!(
                "Block {hash} is frozen and cannot be modified"
            )));
        }
        Ok(())
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_miner_address(&self) -> &str {
        self.miner_address.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    /// The last slot of a mined block holds its reward transaction.
    pub fn get_reward(&self) -> Option<&Transaction> {
        self.transactions.last().filter(|tx| tx.is_supply())
    }
}

fn push_field(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend((bytes.len() as u64).to_be_bytes());
    data.extend(bytes);
}
