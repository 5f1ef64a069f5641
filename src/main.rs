use anyhow::Context;
use log::{info, warn};

use pow_ledger::blockchain::{Blockchain, ChainConfig, FieldProjection, Transaction};

/// Environment variable naming an optional JSON config file
const CONFIG_ENV: &str = "POW_LEDGER_CONFIG";

fn load_config() -> anyhow::Result<ChainConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let config = ChainConfig::from_file(&path)
                .with_context(|| format!("failed to load config from {}", path))?;
            info!("Loaded config from {}", path);
            Ok(config)
        }
        Err(_) => {
            info!("{} not set, using default config", CONFIG_ENV);
            Ok(ChainConfig::default())
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = load_config()?;
    let target = config.min_difficulty;
    let blockchain = Blockchain::with_config(config)?;
    let genesis = blockchain.genesis()?;

    let mut ledger = blockchain.new_ledger();
    ledger.insert(Transaction::new("Saul", "Bush", 10.0)?)?;
    let block1 = blockchain.propose_block(genesis.hash(), &ledger, target)?;
    blockchain.insert(block1.clone())?;

    // Two competing children of block 1
    for (sender, amount) in [("Bush", 4.0), ("Bush", 6.0)] {
        let mut ledger = blockchain.new_ledger();
        ledger.insert(Transaction::new(sender, "Saul", amount)?)?;
        let block = blockchain.propose_block(block1.hash(), &ledger, target)?;
        blockchain.insert(block)?;
    }

    // Replaying a block is rejected and leaves the chain untouched
    if let Err(err) = blockchain.insert(block1.clone()) {
        warn!("Replay rejected as expected: {}", err);
    }

    let stats = blockchain.stats()?;
    info!(
        "{} blocks, {} tips, best tip {} at index {}",
        stats.blocks, stats.tips, stats.best_hash, stats.best_index
    );

    for block in blockchain.canonical_chain()? {
        println!("{}", block.describe());
        for tx in block.transactions.iter() {
            println!("    {}", tx.describe());
        }
    }

    blockchain
        .verify_canonical_chain()
        .context("canonical chain failed verification")?;

    Ok(())
}
