//! Scan error taxonomy
//!
//! Every variant is recovered locally: a failed candidate is reported as a
//! query failure and the loop moves on. The only fatal condition in the
//! program is an unreachable endpoint at startup, which is handled before
//! the scanner starts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// HTTP transport failure (connection refused, reset, malformed body)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Error object returned by the node for a request in the batch
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    /// Balance value that does not parse as a hex quantity
    #[error("malformed balance value {0:?}")]
    MalformedBalance(String),

    /// Batch response missing an entry for a request id
    #[error("missing response for request id {0}")]
    MissingResponse(u64),

    /// Address derivation failure for a candidate
    #[error("derivation failed: {0}")]
    Derivation(String),
}
