//! Output sink: console reporting and the append-only hit log
//!
//! Workers share one `Reporter`; every write happens under a scoped lock so
//! concurrent completions never interleave within a line.

use crate::candidate::Candidate;
use crate::format_eth;
use crate::scanner::ScanResult;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Append-only log of funded seeds.
///
/// Lines are only ever appended, never rewritten; the file survives restarts
/// and grows monotonically.
pub struct HitLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl HitLog {
    /// Open (or create) the hit log for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open hit log {:?}", path))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line atomically (lock held only for the write)
    pub fn append(&self, line: &str) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to append to hit log {:?}", self.path))?;
        Ok(())
    }
}

/// Serialized output sink shared by all workers.
///
/// Routes every scan result to the console, funded results additionally to
/// the hit log, and emits a `Checked N seeds...` counter line once per
/// `report_interval` processed candidates.
pub struct Reporter {
    console: Mutex<Box<dyn Write + Send>>,
    hit_log: HitLog,
    processed: AtomicU64,
    report_interval: u64,
}

impl Reporter {
    /// Reporter writing to stdout
    pub fn new(hit_log: HitLog, report_interval: u64) -> Self {
        Self::with_console(Box::new(std::io::stdout()), hit_log, report_interval)
    }

    /// Reporter writing to an arbitrary console stream (tests use a buffer)
    pub fn with_console(
        console: Box<dyn Write + Send>,
        hit_log: HitLog,
        report_interval: u64,
    ) -> Self {
        Self {
            console: Mutex::new(console),
            hit_log,
            processed: AtomicU64::new(0),
            report_interval,
        }
    }

    /// Number of candidates reported so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Route one scan result to the sink. Called exactly once per candidate.
    pub fn report(&self, candidate: &Candidate, result: &ScanResult) -> Result<()> {
        match result {
            ScanResult::NoFunds => {
                self.console_line(&format!("{} - NO FUNDS", candidate))?;
            }
            ScanResult::Funded {
                index,
                address,
                balance_wei,
            } => {
                let balance = format_eth(*balance_wei);
                self.console_line(&format!(
                    "[FOUND FUNDS] {} | [{}]: {} | Balance: {}",
                    candidate, index, address, balance
                ))?;
                self.hit_log.append(&format!(
                    "Seed: {} | Address[{}]: {} | Balance: {} ETH",
                    candidate, index, address, balance
                ))?;
            }
            ScanResult::QueryFailed(error) => {
                self.console_line(&format!("{} - RPC ERROR: {}", candidate, error))?;
            }
        }

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.report_interval > 0 && processed % self.report_interval == 0 {
            self.console_line(&format!("Checked {} seeds...", processed))?;
        }
        Ok(())
    }

    fn console_line(&self, line: &str) -> Result<()> {
        let mut console = self.console.lock().unwrap();
        writeln!(console, "{}", line).context("Failed to write console line")?;
        Ok(())
    }
}
