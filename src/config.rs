//! Scanner configuration

use std::path::PathBuf;

/// Runtime parameters for a scan, passed to the scanner at construction.
///
/// Every field has a startup default; the CLI may override any of them
/// without changing scan behavior.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Balance query endpoint (Ethereum JSON-RPC over HTTP)
    pub rpc_url: String,
    /// Append-only hit log for funded seeds
    pub output_file: PathBuf,
    /// Number of addresses derived and checked per seed
    pub addresses_per_seed: usize,
    /// Maximum number of in-flight scans
    pub concurrency: usize,
    /// Emit a progress counter line every this many processed seeds
    pub report_interval: u64,
    /// Words per generated mnemonic (12 or 24)
    pub word_count: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            output_file: PathBuf::from("found_wallets.txt"),
            addresses_per_seed: 30,
            concurrency: 50,
            report_interval: 100,
            word_count: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.output_file, PathBuf::from("found_wallets.txt"));
        assert_eq!(config.addresses_per_seed, 30);
        assert_eq!(config.concurrency, 50);
        assert_eq!(config.report_interval, 100);
        assert_eq!(config.word_count, 12);
    }
}
