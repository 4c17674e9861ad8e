//! Bounded scanner loop
//!
//! An unbounded stream of candidates is driven through a fixed pool of
//! long-lived workers fed by a bounded channel. At no instant are more than
//! `concurrency` scans in flight; when every worker is busy the producer
//! blocks on the channel until a slot frees up. One result is reported per
//! admitted candidate, in completion order. A failed balance query for one
//! candidate never aborts the loop or the other workers.

use crate::candidate::{Candidate, CandidateGenerator};
use crate::config::ScanConfig;
use crate::derive::{derive_addresses, EthAddress};
use crate::error::ScanError;
use crate::rpc::BalanceSource;
use crate::sink::Reporter;
use anyhow::{ensure, Result};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Outcome of scanning one candidate
#[derive(Debug)]
pub enum ScanResult {
    /// Every derived address reported a zero balance
    NoFunds,
    /// First derived address holding a nonzero balance
    Funded {
        index: usize,
        address: EthAddress,
        balance_wei: u128,
    },
    /// Derivation or balance query failed; the candidate was not confirmed
    /// empty
    QueryFailed(ScanError),
}

/// Scan a single candidate: derive its addresses and query their balances.
///
/// Reports the first funded index, the original stops at the first hit.
/// Derivation runs on the blocking pool; the balance query is the only
/// suspension point.
pub async fn scan_candidate(
    candidate: &Candidate,
    addresses_per_seed: usize,
    source: &dyn BalanceSource,
) -> ScanResult {
    let phrase = candidate.clone();
    let derived = tokio::task::spawn_blocking(move || derive_addresses(&phrase, addresses_per_seed))
        .await
        .unwrap_or_else(|e| Err(ScanError::Derivation(format!("derivation task failed: {}", e))));

    let addresses = match derived {
        Ok(addresses) => addresses,
        Err(e) => return ScanResult::QueryFailed(e),
    };

    let balances = match source.balances(&addresses).await {
        Ok(balances) => balances,
        Err(e) => return ScanResult::QueryFailed(e),
    };

    for (index, (address, balance_wei)) in addresses.iter().zip(balances).enumerate() {
        if balance_wei > 0 {
            return ScanResult::Funded {
                index,
                address: *address,
                balance_wei,
            };
        }
    }
    ScanResult::NoFunds
}

/// Drives candidates through the bounded worker pool
pub struct Scanner {
    config: ScanConfig,
    generator: CandidateGenerator,
    source: Arc<dyn BalanceSource>,
    reporter: Arc<Reporter>,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        generator: CandidateGenerator,
        source: Arc<dyn BalanceSource>,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            config,
            generator,
            source,
            reporter,
        }
    }

    /// Run the scan loop.
    ///
    /// Admits fresh candidates until `limit` is reached (`None` runs forever)
    /// or the shutdown flag flips, then drains the in-flight scans and joins
    /// the workers. Every admitted candidate is reported exactly once.
    pub async fn run(&self, limit: Option<u64>, shutdown: Arc<AtomicBool>) -> Result<()> {
        ensure!(self.config.concurrency > 0, "concurrency must be positive");

        let (tx, rx) = mpsc::channel::<Candidate>(self.config.concurrency);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(self.config.concurrency);
        for worker_id in 0..self.config.concurrency {
            let rx = Arc::clone(&rx);
            let source = Arc::clone(&self.source);
            let reporter = Arc::clone(&self.reporter);
            let addresses_per_seed = self.config.addresses_per_seed;

            workers.push(tokio::spawn(async move {
                loop {
                    // Lock scoped to the recv so siblings can pull work
                    let candidate = { rx.lock().await.recv().await };
                    let Some(candidate) = candidate else {
                        debug!("worker {} draining, channel closed", worker_id);
                        break;
                    };

                    let result =
                        scan_candidate(&candidate, addresses_per_seed, source.as_ref()).await;
                    if let Err(e) = reporter.report(&candidate, &result) {
                        error!("failed to report result for candidate: {}", e);
                    }
                }
            }));
        }

        let started = Instant::now();
        let mut admitted: u64 = 0;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("shutdown requested, draining in-flight scans");
                break;
            }
            if limit.is_some_and(|n| admitted >= n) {
                break;
            }
            let candidate = self.generator.generate();
            if tx.send(candidate).await.is_err() {
                break;
            }
            admitted += 1;
        }

        // Closing the channel lets the workers drain and exit
        drop(tx);
        for worker in workers {
            worker.await?;
        }

        let elapsed = started.elapsed();
        let processed = self.reporter.processed();
        info!(
            "processed {} seeds in {:.1?} ({:.2} seeds/sec)",
            processed,
            elapsed,
            processed as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::HitLog;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, AtomicUsize};
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    /// Shared in-memory console stream
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Stub source funding one specific call at one specific derived index
    struct ScriptedSource {
        calls: AtomicU64,
        funded_call: Option<u64>,
        funded_index: usize,
        balance_wei: u128,
    }

    impl ScriptedSource {
        fn all_zero() -> Self {
            Self {
                calls: AtomicU64::new(0),
                funded_call: None,
                funded_index: 0,
                balance_wei: 0,
            }
        }

        fn funded_at(call: u64, index: usize, balance_wei: u128) -> Self {
            Self {
                calls: AtomicU64::new(0),
                funded_call: Some(call),
                funded_index: index,
                balance_wei,
            }
        }
    }

    #[async_trait]
    impl BalanceSource for ScriptedSource {
        async fn balances(&self, addresses: &[EthAddress]) -> Result<Vec<u128>, ScanError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut balances = vec![0u128; addresses.len()];
            if Some(call) == self.funded_call {
                balances[self.funded_index] = self.balance_wei;
            }
            Ok(balances)
        }
    }

    /// Stub source tracking the in-flight high-water mark
    struct GaugeSource {
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl GaugeSource {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BalanceSource for GaugeSource {
        async fn balances(&self, addresses: &[EthAddress]) -> Result<Vec<u128>, ScanError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![0u128; addresses.len()])
        }
    }

    /// Stub source that always fails
    struct FailingSource;

    #[async_trait]
    impl BalanceSource for FailingSource {
        async fn balances(&self, _addresses: &[EthAddress]) -> Result<Vec<u128>, ScanError> {
            Err(ScanError::MissingResponse(0))
        }
    }

    fn test_config(concurrency: usize) -> ScanConfig {
        ScanConfig {
            addresses_per_seed: 4,
            concurrency,
            report_interval: 100,
            ..ScanConfig::default()
        }
    }

    fn build_scanner(
        config: ScanConfig,
        source: Arc<dyn BalanceSource>,
        log_path: &std::path::Path,
    ) -> (Scanner, SharedBuf) {
        let console = SharedBuf::default();
        let reporter = Arc::new(Reporter::with_console(
            Box::new(console.clone()),
            HitLog::open(log_path).unwrap(),
            config.report_interval,
        ));
        let generator = CandidateGenerator::new(12).unwrap();
        (Scanner::new(config, generator, source, reporter), console)
    }

    async fn run_to_limit(scanner: &Scanner, limit: u64) {
        scanner
            .run(Some(limit), Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_all_zero_balances_report_no_funds() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let (scanner, console) =
            build_scanner(test_config(8), Arc::new(ScriptedSource::all_zero()), &log_path);

        run_to_limit(&scanner, 50).await;

        let output = console.contents();
        assert_eq!(output.matches(" - NO FUNDS").count(), 50);
        assert_eq!(output.matches("[FOUND FUNDS]").count(), 0);
        assert_eq!(std::fs::metadata(&log_path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_single_funded_candidate_hits_log_once() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let source = Arc::new(ScriptedSource::funded_at(7, 3, 2_000_000_000_000_000_000));
        let (scanner, console) = build_scanner(test_config(4), source, &log_path);

        run_to_limit(&scanner, 20).await;

        let output = console.contents();
        assert_eq!(output.matches("[FOUND FUNDS]").count(), 1);
        assert_eq!(output.matches(" - NO FUNDS").count(), 19);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("Address[3]:"));
        assert!(log.contains("Balance: 2 ETH"));
    }

    #[tokio::test]
    async fn test_query_failures_do_not_abort_the_loop() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let (scanner, console) = build_scanner(test_config(4), Arc::new(FailingSource), &log_path);

        run_to_limit(&scanner, 10).await;

        let output = console.contents();
        assert_eq!(output.matches(" - RPC ERROR:").count(), 10);
        assert_eq!(std::fs::metadata(&log_path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_scans_never_exceed_concurrency() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let gauge = Arc::new(GaugeSource::new());
        let (scanner, _) = build_scanner(test_config(3), gauge.clone(), &log_path);

        run_to_limit(&scanner, 30).await;

        let high_water = gauge.high_water.load(Ordering::SeqCst);
        assert!(high_water <= 3, "in-flight high water {} exceeds cap", high_water);
        assert!(high_water >= 1);
    }

    #[tokio::test]
    async fn test_counter_line_after_one_hundred() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let (scanner, console) =
            build_scanner(test_config(8), Arc::new(ScriptedSource::all_zero()), &log_path);

        run_to_limit(&scanner, 100).await;

        let output = console.contents();
        assert_eq!(output.matches("Checked 100 seeds...").count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flag_stops_admission() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let (scanner, _) =
            build_scanner(test_config(2), Arc::new(ScriptedSource::all_zero()), &log_path);

        // Pre-flipped flag: the loop must exit without admitting anything
        let shutdown = Arc::new(AtomicBool::new(true));
        scanner.run(None, shutdown).await.unwrap();

        assert_eq!(scanner.reporter.processed(), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("found.txt");
        let (scanner, _) =
            build_scanner(test_config(0), Arc::new(ScriptedSource::all_zero()), &log_path);

        let result = scanner.run(Some(1), Arc::new(AtomicBool::new(false))).await;
        assert!(result.is_err());
    }
}
