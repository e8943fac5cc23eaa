//! Persisted ledger state.
//!
//! A snapshot holds the ordered block list, the full balance table and the
//! save instant. Loading re-trusts every stored block hash without redoing
//! proof-of-work; call `Ledger::is_chain_valid` afterwards to confirm
//! integrity.

use crate::core::Block;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub blocks: Vec<Block>,
    pub balances: BTreeMap<String, u64>,
    pub saved_at: i64,
    /// Difficulty in force when the snapshot was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
}

pub fn save_to_file(snapshot: &LedgerSnapshot, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    info!(
        "Saved {} blocks and {} balances to {}",
        snapshot.blocks.len(),
        snapshot.balances.len(),
        path.display()
    );
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<LedgerSnapshot> {
    let file = File::open(path)?;
    let snapshot: LedgerSnapshot = serde_json::from_reader(BufReader::new(file))?;
    info!(
        "Loaded {} blocks from {}",
        snapshot.blocks.len(),
        path.display()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    #[test]
    fn test_file_round_trip_keeps_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut balances = BTreeMap::new();
        balances.insert("root".to_string(), 100);
        let snapshot = LedgerSnapshot {
            blocks: vec![Block::genesis()],
            balances,
            saved_at: 1_700_000_000_000,
            difficulty: Some(3),
        };

        save_to_file(&snapshot, &path).unwrap();
        let loaded = load_from_file(&path).unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.blocks[0].hash(), Block::genesis().hash());
    }

    #[test]
    fn test_missing_difficulty_field_is_accepted() {
        let json = serde_json::json!({
            "blocks": [],
            "balances": {"root": 100},
            "savedAt": 5
        });
        let snapshot: LedgerSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.difficulty, None);
        assert_eq!(snapshot.balances["root"], 100);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(LedgerError::Io(_))));
    }
}
