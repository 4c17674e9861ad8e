//! Ethereum address derivation
//!
//! Derivation path: BIP-39 phrase -> 64-byte seed (empty passphrase) ->
//! BIP-44 `m/44'/60'/0'/0/{index}` -> secp256k1 public key -> Keccak-256 of
//! the uncompressed point (without the 0x04 tag) -> last 20 bytes.
//!
//! Pure and deterministic: the same candidate and index always produce the
//! same address.

use crate::candidate::Candidate;
use crate::error::ScanError;
use bip39::Mnemonic;
use rayon::prelude::*;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use std::fmt;
use tiny_hderive::bip32::ExtendedPrivKey;

// Pre-compute and cache the secp256k1 context
thread_local! {
    static SECP: Secp256k1<secp256k1::All> = Secp256k1::new();
}

/// A derived Ethereum address (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthAddress([u8; 20]);

impl EthAddress {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl From<[u8; 20]> for EthAddress {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Derive the first `count` external-chain addresses for a candidate.
///
/// The PBKDF2 seed stretch runs once; per-index derivation fans out across
/// the rayon pool. CPU-bound, call from a blocking context.
pub fn derive_addresses(candidate: &Candidate, count: usize) -> Result<Vec<EthAddress>, ScanError> {
    let mnemonic = Mnemonic::parse(candidate.phrase())
        .map_err(|e| ScanError::Derivation(format!("invalid mnemonic: {}", e)))?;
    let seed = mnemonic.to_seed("");

    (0..count)
        .into_par_iter()
        .map(|index| derive_at_index(&seed, index))
        .collect()
}

/// Derive the address at a single account index
fn derive_at_index(seed: &[u8], index: usize) -> Result<EthAddress, ScanError> {
    let path = format!("m/44'/60'/0'/0/{}", index);
    let derived = ExtendedPrivKey::derive(seed, path.as_str())
        .map_err(|e| ScanError::Derivation(format!("{}: {:?}", path, e)))?;

    let secret_key = SecretKey::from_slice(&derived.secret())
        .map_err(|e| ScanError::Derivation(format!("{}: {}", path, e)))?;
    let public_key = SECP.with(|secp| PublicKey::from_secret_key(secp, &secret_key));

    // Keccak256 of the uncompressed pubkey, skipping the 0x04 prefix byte
    let uncompressed = public_key.serialize_uncompressed();
    let keccak_hash = Keccak256::digest(&uncompressed[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&keccak_hash[12..]);
    Ok(EthAddress(address))
}
