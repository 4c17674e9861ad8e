//! Bounded-concurrency seed phrase scanner library
//!
//! This library provides functionality to generate random BIP-39 mnemonic
//! seed phrases, derive Ethereum addresses from each, query a JSON-RPC node
//! for the account balances, and record any seed whose derived addresses
//! hold nonzero funds:
//! - Candidate generation (fresh entropy per phrase, never reused)
//! - BIP-44 address derivation (`m/44'/60'/0'/0/{index}`)
//! - Batched `eth_getBalance` queries over HTTP
//! - A fixed-size worker pool capped at a configured concurrency level

pub mod candidate;
pub mod config;
pub mod derive;
pub mod error;
pub mod rpc;
pub mod scanner;
pub mod sink;

pub use candidate::{Candidate, CandidateGenerator};
pub use config::ScanConfig;
pub use derive::{derive_addresses, EthAddress};
pub use error::ScanError;
pub use rpc::{BalanceSource, EthRpcClient};
pub use scanner::{scan_candidate, ScanResult, Scanner};
pub use sink::{HitLog, Reporter};

/// Display scale: 1 ETH = 10^18 wei
pub const WEI_PER_ETH: f64 = 1e18;

/// Format a wei amount in the display unit (ETH)
pub fn format_eth(wei: u128) -> String {
    format!("{}", wei as f64 / WEI_PER_ETH)
}
