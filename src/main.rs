// Entry point for the ledger CLI
// Every invocation loads the snapshot, runs one command against the in-memory
// ledger and writes the snapshot back if the command changed anything
use clap::Parser;
use log::{error, info, LevelFilter};
use pow_ledger::core::ROOT_ADDRESS;
use pow_ledger::{
    load_from_file, save_to_file, validate_address, Command, Ledger, LedgerConfig, LedgerError,
    MinedBlock, Opt, Wallets, WALLET_FILE,
};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// How often a background mining attempt reports progress
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerConfig::load(opt.config.as_deref())?;

    match opt.command {
        Command::Createwallet => {
            let mut wallets = Wallets::open(Path::new(WALLET_FILE));
            let address = wallets.create_wallet()?;
            println!("Your new address: {address}")
        }
        Command::ListAddresses => {
            let wallets = Wallets::open(Path::new(WALLET_FILE));
            for address in wallets.get_addresses() {
                println!("{address}")
            }
        }
        Command::CreateLedger { difficulty } => {
            if config.ledger_file.exists() {
                return Err(format!(
                    "Ledger already exists at {}",
                    config.ledger_file.display()
                )
                .into());
            }
            let ledger = Ledger::new(config)?;
            if let Some(value) = difficulty {
                ledger.set_difficulty(value);
            }
            save_ledger(&ledger)?;
            println!("Done! Genesis block: {}", ledger.tip_hash());
        }
        Command::GetBalance { address } => {
            let ledger = load_ledger(config)?;
            let balance = ledger.balance_of(&address);
            println!("Balance of {address}: {balance}");
        }
        Command::History { address } => {
            let ledger = load_ledger(config)?;
            for entry in ledger.balance_history(&address) {
                println!(
                    "Block {:>4}  timestamp {:>14}  balance {}",
                    entry.block_height, entry.timestamp, entry.balance
                );
            }
        }
        Command::Send {
            from,
            to,
            amount,
            fee,
            miner,
        } => {
            if !validate_address(&from) {
                return Err(format!("Invalid sender address: {from}").into());
            }
            if to != ROOT_ADDRESS && !validate_address(&to) {
                return Err(format!("Invalid recipient address: {to}").into());
            }

            let wallets = Wallets::open(Path::new(WALLET_FILE));
            let wallet = wallets
                .get_wallet(&from)
                .ok_or_else(|| format!("No local wallet for {from}"))?;

            let ledger = load_ledger(config)?;
            let transaction = wallet.create_transaction(&to, amount, fee)?;
            ledger.submit_transaction(transaction)?;

            let miner = miner.unwrap_or(from);
            let mined = ledger.mine_block(&miner)?;
            save_ledger(&ledger)?;
            print_mined(&mined);
            println!("Success!")
        }
        Command::Mine { miner } => {
            let ledger = Arc::new(load_ledger(config)?);
            let handle = ledger.spawn_mining(&miner)?;
            while !handle.is_finished() {
                thread::sleep(PROGRESS_INTERVAL);
                info!("Mining... {} attempts", handle.attempts());
            }
            let mined = handle.join()?;
            save_ledger(&ledger)?;
            print_mined(&mined);
        }
        Command::Printchain => {
            let ledger = load_ledger(config)?;
            for (height, block) in ledger.chain().iter().enumerate() {
                println!("Block {height}");
                println!("Pre block hash: {}", block.get_previous_hash());
                println!("Cur block hash: {}", block.hash());
                println!("Timestamp: {}", block.get_timestamp());
                println!("Nonce: {}", block.get_nonce());
                println!("Miner: {}", block.get_miner_address());

                for tx in block.get_transactions() {
                    println!(
                        "- {:?} {} -> {}: amount {}, fee {}",
                        tx.get_kind(),
                        tx.get_payer(),
                        tx.get_payee(),
                        tx.get_amount(),
                        tx.get_fee()
                    );
                }
                println!()
            }
        }
        Command::Validate => {
            let ledger = load_ledger(config)?;
            let issues = ledger.audit_chain();
            if issues.is_empty() {
                println!(
                    "Chain of {} blocks is valid at difficulty {}",
                    ledger.chain_length(),
                    ledger.difficulty()
                );
            } else {
                for issue in &issues {
                    println!("{issue:?}");
                }
                return Err(format!("Chain has {} integrity problems", issues.len()).into());
            }
        }
        Command::SetDifficulty { value } => {
            let ledger = load_ledger(config)?;
            let difficulty = ledger.set_difficulty(value);
            save_ledger(&ledger)?;
            println!("Difficulty is now {difficulty}");
            if !ledger.is_chain_valid() {
                println!("Warning: existing blocks do not meet the new difficulty");
            }
        }
    }
    Ok(())
}

fn load_ledger(config: LedgerConfig) -> Result<Ledger, LedgerError> {
    if !config.ledger_file.exists() {
        return Err(LedgerError::Config(format!(
            "No ledger at {}. Use 'createledger' first.",
            config.ledger_file.display()
        )));
    }
    let snapshot = load_from_file(&config.ledger_file)?;
    Ledger::restore(snapshot, config)
}

fn save_ledger(ledger: &Ledger) -> Result<(), LedgerError> {
    let snapshot = ledger.snapshot()?;
    save_to_file(&snapshot, &ledger.config().ledger_file)
}

fn print_mined(mined: &MinedBlock) {
    println!(
        "Mined block {} with {} transactions: {} ({} attempts, {} ms)",
        mined.height,
        mined.block.get_transactions().len(),
        mined.block.hash(),
        mined.attempts,
        mined.elapsed.as_millis()
    );
}
