use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pow-ledger")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(
        name = "createledger",
        about = "Create a new ledger holding only the genesis block"
    )]
    CreateLedger {
        #[arg(long = "difficulty", help = "Leading zero hex digits required (1-8)")]
        difficulty: Option<u32>,
    },
    #[command(
        name = "getbalance",
        about = "Get the confirmed balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The account address")]
        address: String,
    },
    #[command(name = "history", about = "Print the balance of an address after each block")]
    History {
        #[arg(help = "The account address")]
        address: String,
    },
    #[command(name = "send", about = "Sign a transfer, submit it and mine a block")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
        #[arg(long = "fee", default_value_t = 0, help = "Fee paid to the miner")]
        fee: u64,
        #[arg(
            long = "miner",
            help = "Address receiving the block reward (defaults to the sender)"
        )]
        miner: Option<String>,
    },
    #[command(name = "mine", about = "Mine pending transactions into a new block")]
    Mine {
        #[arg(help = "Address receiving the block reward")]
        miner: String,
    },
    #[command(name = "printchain", about = "Print all blocks in the ledger")]
    Printchain,
    #[command(name = "validate", about = "Check chain links, difficulty and stored hashes")]
    Validate,
    #[command(name = "setdifficulty", about = "Change the global mining difficulty")]
    SetDifficulty {
        #[arg(help = "Leading zero hex digits required (clamped to 1-8)")]
        value: u32,
    },
}
