//! Candidate seed phrase generation
//!
//! A candidate is a freshly generated BIP-39 mnemonic. Candidates are opaque
//! to the scanner: generated once, scanned once, then discarded.

use anyhow::{bail, Result};
use bip39::Mnemonic;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// A randomly generated seed phrase to test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(phrase.into())
    }

    /// The mnemonic phrase (space-separated English words)
    pub fn phrase(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces fresh random candidates from OS entropy.
///
/// Pure generation: no I/O beyond the entropy source, no state shared
/// between calls, no candidate ever repeated (up to entropy collision).
pub struct CandidateGenerator {
    entropy_len: usize,
}

impl CandidateGenerator {
    /// Create a generator for 12-word (128-bit) or 24-word (256-bit) phrases
    pub fn new(word_count: usize) -> Result<Self> {
        let entropy_len = match word_count {
            12 => 16,
            24 => 32,
            other => bail!("unsupported word count {} (expected 12 or 24)", other),
        };
        Ok(Self { entropy_len })
    }

    /// Generate a fresh candidate phrase
    pub fn generate(&self) -> Candidate {
        let mut entropy = vec![0u8; self.entropy_len];
        OsRng.fill_bytes(&mut entropy);
        let mnemonic =
            Mnemonic::from_entropy(&entropy).expect("entropy length validated at construction");
        Candidate(mnemonic.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_valid_12_word_phrase() {
        let generator = CandidateGenerator::new(12).unwrap();
        let candidate = generator.generate();

        assert_eq!(candidate.phrase().split_whitespace().count(), 12);
        // Round-trips through the BIP-39 parser (checksum included)
        Mnemonic::parse(candidate.phrase()).unwrap();
    }

    #[test]
    fn test_generates_valid_24_word_phrase() {
        let generator = CandidateGenerator::new(24).unwrap();
        let candidate = generator.generate();

        assert_eq!(candidate.phrase().split_whitespace().count(), 24);
        Mnemonic::parse(candidate.phrase()).unwrap();
    }

    #[test]
    fn test_candidates_are_fresh() {
        let generator = CandidateGenerator::new(12).unwrap();
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_unsupported_word_count() {
        assert!(CandidateGenerator::new(13).is_err());
        assert!(CandidateGenerator::new(0).is_err());
    }
}
