//! Kiln CPU forging utility.
//!
//! Spins up a forging engine over a set of generated staking accounts and
//! forges a short self-feeding chain: each sealed block becomes the parent
//! of the next template.
//!
//! Usage:
//!   kiln-forge --accounts 4 --blocks 3

use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{B256, U256};
use clap::Parser;
use kiln_forging::{ForgingConfig, ForgingEngine};
use kiln_primitives::Block;
use kiln_wallet::{AccountState, DelegatedKeypair, WalletEntry};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Kiln CPU forger
#[derive(Debug, Parser)]
#[command(name = "kiln-forge")]
#[command(about = "CPU forger for the Kiln proof-of-stake chain")]
struct Args {
    /// Number of staking accounts to generate
    #[arg(long, short = 'a', default_value = "4")]
    accounts: usize,

    /// Number of worker threads (0 = auto-detect)
    #[arg(long, short = 't', default_value = "0")]
    threads: usize,

    /// Number of blocks to forge before exiting
    #[arg(long, short = 'n', default_value = "3")]
    blocks: u64,

    /// Difficulty divisor: the stake target is U256::MAX / difficulty
    #[arg(long, short = 'd', default_value = "1")]
    difficulty: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let threads = if args.threads == 0 {
        num_cpus::get()
    } else {
        args.threads
    };

    let entries: Vec<WalletEntry> = (0..args.accounts.max(1))
        .map(|i| {
            let key = DelegatedKeypair::generate();
            WalletEntry::new(&key, Some(AccountState::new(1_000 * (i as u64 + 1))))
        })
        .collect();

    let target = if args.difficulty == 0 {
        U256::MAX
    } else {
        U256::MAX / U256::from(args.difficulty)
    };

    info!(
        target: "kiln::forge",
        accounts = entries.len(),
        threads,
        blocks = args.blocks,
        difficulty = args.difficulty,
        "starting Kiln CPU forger"
    );

    let (engine, mut solutions) = ForgingEngine::new(entries, ForgingConfig::default())?;
    engine.start(threads);

    let mut height = 0u64;
    let mut prev_hash = B256::ZERO;
    let mut forged = 0u64;

    engine.replace_work(Block::new(height, prev_hash, unix_now()), target);

    while forged < args.blocks {
        let Some(block) = solutions.recv().await else {
            break;
        };

        info!(
            target: "kiln::forge",
            height = block.height,
            hash = %block.hash(),
            forger = %block.forger,
            timestamp = block.timestamp,
            staking_amount = block.staking_amount,
            "block forged"
        );

        forged += 1;
        prev_hash = block.hash();
        height = block.height + 1;
        engine.replace_work(Block::new(height, prev_hash, block.timestamp), target);
    }

    engine.stop();
    Ok(())
}
