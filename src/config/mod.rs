//! Configuration management
//!
//! Engine parameters (difficulty, mempool bounds, reward) and the snapshot
//! file location, layered from defaults, a TOML file and the environment.

pub mod settings;

pub use settings::LedgerConfig;
