//! Seed phrase scanner CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use seed_scanner::{
    derive_addresses, format_eth, BalanceSource, Candidate, CandidateGenerator, EthRpcClient,
    HitLog, Reporter, ScanConfig, Scanner,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "seed-scanner")]
#[command(about = "Scan random BIP-39 seed phrases for funded Ethereum addresses")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Continuously generate seed phrases and scan their derived addresses
    Run {
        /// Ethereum JSON-RPC endpoint
        #[arg(long, default_value = "http://127.0.0.1:8545")]
        rpc_url: String,

        /// Append-only output file for funded seeds
        #[arg(short, long, default_value = "found_wallets.txt")]
        output: PathBuf,

        /// Number of addresses derived and checked per seed
        #[arg(long, default_value = "30")]
        addresses_per_seed: usize,

        /// Maximum number of in-flight scans
        #[arg(short, long, default_value = "50")]
        concurrency: usize,

        /// Words per generated phrase (12 or 24)
        #[arg(long, default_value = "12")]
        words: usize,

        /// Stop after this many seeds (default: run until interrupted)
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Derive addresses for a single seed phrase and query their balances
    Test {
        /// The seed phrase to test
        phrase: String,

        /// Ethereum JSON-RPC endpoint
        #[arg(long, default_value = "http://127.0.0.1:8545")]
        rpc_url: String,

        /// Number of addresses to derive
        #[arg(long, default_value = "30")]
        addresses_per_seed: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            rpc_url,
            output,
            addresses_per_seed,
            concurrency,
            words,
            limit,
        } => {
            let config = ScanConfig {
                rpc_url,
                output_file: output,
                addresses_per_seed,
                concurrency,
                word_count: words,
                ..ScanConfig::default()
            };
            run_scan(config, limit).await?;
        }
        Commands::Test {
            phrase,
            rpc_url,
            addresses_per_seed,
        } => {
            run_test(phrase, rpc_url, addresses_per_seed).await?;
        }
    }

    Ok(())
}

/// Connect to the node, failing loudly if it is unreachable.
///
/// This is the only fatal error in the program; everything after startup
/// degrades gracefully.
async fn connect(rpc_url: &str) -> Result<EthRpcClient> {
    let client = EthRpcClient::new(rpc_url)?;
    match client.health_check().await {
        Ok(height) => {
            info!("Connected to {} (block height {})", rpc_url, height);
            Ok(client)
        }
        Err(e) => {
            error!("Cannot reach balance-query endpoint {}: {}", rpc_url, e);
            Err(e).with_context(|| format!("Unreachable JSON-RPC endpoint {}", rpc_url))
        }
    }
}

async fn run_scan(config: ScanConfig, limit: Option<u64>) -> Result<()> {
    let client = connect(&config.rpc_url).await?;

    let generator = CandidateGenerator::new(config.word_count)?;
    let hit_log = HitLog::open(&config.output_file)?;
    info!("Appending funded seeds to {:?}", hit_log.path());

    let reporter = Arc::new(Reporter::new(hit_log, config.report_interval));

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    info!(
        "Scanning with {} workers, {} addresses per seed",
        config.concurrency, config.addresses_per_seed
    );

    let scanner = Scanner::new(config, generator, Arc::new(client), Arc::clone(&reporter));
    scanner.run(limit, shutdown).await?;

    Ok(())
}

async fn run_test(phrase: String, rpc_url: String, addresses_per_seed: usize) -> Result<()> {
    let candidate = Candidate::new(phrase.trim());
    let addresses = derive_addresses(&candidate, addresses_per_seed)
        .context("Failed to derive addresses from the given phrase")?;

    let client = connect(&rpc_url).await?;
    let balances = client
        .balances(&addresses)
        .await
        .context("Balance query failed")?;

    println!("Seed: {}", candidate);
    let mut funded = 0usize;
    for (index, (address, balance_wei)) in addresses.iter().zip(&balances).enumerate() {
        println!(
            "  [{}] {} | Balance: {} ETH",
            index,
            address,
            format_eth(*balance_wei)
        );
        if *balance_wei > 0 {
            funded += 1;
        }
    }

    if funded > 0 {
        println!("{} of {} addresses hold funds", funded, addresses.len());
    } else {
        println!("No funds on the first {} addresses", addresses.len());
    }

    Ok(())
}
