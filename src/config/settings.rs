use crate::core::difficulty::DEFAULT_DIFFICULTY;
use crate::core::monetary::{DEFAULT_MEMPOOL_CAPACITY, MAX_TRANSACTIONS_PER_BLOCK, MINING_REWARD};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

static DEFAULT_LEDGER_FILE: &str = "ledger.json";

const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const MEMPOOL_CAPACITY_KEY: &str = "LEDGER_MEMPOOL_CAPACITY";
const MAX_TXS_PER_BLOCK_KEY: &str = "LEDGER_MAX_TXS_PER_BLOCK";
const MINING_REWARD_KEY: &str = "LEDGER_MINING_REWARD";
const LEDGER_FILE_KEY: &str = "LEDGER_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub difficulty: u32,
    pub mempool_capacity: usize,
    pub max_transactions_per_block: usize,
    pub mining_reward: u64,
    pub ledger_file: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: DEFAULT_DIFFICULTY,
            mempool_capacity: DEFAULT_MEMPOOL_CAPACITY,
            max_transactions_per_block: MAX_TRANSACTIONS_PER_BLOCK,
            mining_reward: MINING_REWARD,
            ledger_file: PathBuf::from(DEFAULT_LEDGER_FILE),
        }
    }
}

impl LedgerConfig {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<LedgerConfig> {
        let config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => LedgerConfig::default(),
        };
        config.with_env_overrides()
    }

    pub fn from_toml_str(contents: &str) -> Result<LedgerConfig> {
        let config: LedgerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<LedgerConfig> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_env_overrides(mut self) -> Result<LedgerConfig> {
        if let Some(value) = read_env(DIFFICULTY_KEY)? {
            self.difficulty = value;
        }
        if let Some(value) = read_env(MEMPOOL_CAPACITY_KEY)? {
            self.mempool_capacity = value;
        }
        if let Some(value) = read_env(MAX_TXS_PER_BLOCK_KEY)? {
            self.max_transactions_per_block = value;
        }
        if let Some(value) = read_env(MINING_REWARD_KEY)? {
            self.mining_reward = value;
        }
        if let Ok(path) = env::var(LEDGER_FILE_KEY) {
            self.ledger_file = PathBuf::from(path);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mempool_capacity == 0 {
            return Err(LedgerError::Config(
                "mempool_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_transactions_per_block == 0 {
            return Err(LedgerError::Config(
                "max_transactions_per_block must be at least 1".to_string(),
            ));
        }
        if self.mining_reward == 0 {
            return Err(LedgerError::Config(
                "mining_reward must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LedgerError::Config(format!("Invalid value for {key}: {raw}"))),
        Err(_) => Ok(None),
    }
}
