//! Balance queries via Ethereum JSON-RPC
//!
//! One batched `eth_getBalance` POST per candidate covers all of its derived
//! addresses. Batch responses are matched by request id rather than array
//! position; JSON-RPC 2.0 does not guarantee response ordering.
//!
//! The HTTP client is built without a timeout: a hung call stalls one worker
//! slot until the node answers or the connection drops.

use crate::derive::EthAddress;
use crate::error::ScanError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

impl<T> JsonRpcRequest<T> {
    fn new(method: &'static str, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A balance lookup service for derived addresses.
///
/// The scanner only depends on this seam; tests substitute a stub.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Balances in wei, in the same order as `addresses`
    async fn balances(&self, addresses: &[EthAddress]) -> Result<Vec<u128>, ScanError>;
}

/// Ethereum JSON-RPC client over HTTP
pub struct EthRpcClient {
    client: reqwest::Client,
    url: String,
}

impl EthRpcClient {
    pub fn new(url: &str) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Startup probe: ask the node for its current block height.
    ///
    /// An unreachable endpoint here is the only fatal error in the program.
    pub async fn health_check(&self) -> Result<u64, ScanError> {
        let request = JsonRpcRequest::new("eth_blockNumber", Vec::<String>::new(), 0);
        let response: JsonRpcResponse<String> = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ScanError::Node {
                code: error.code,
                message: error.message,
            });
        }
        let raw = response
            .result
            .ok_or_else(|| ScanError::MalformedBalance("missing result".to_string()))?;
        let height = parse_hex_quantity(&raw)?;
        Ok(height as u64)
    }
}

#[async_trait]
impl BalanceSource for EthRpcClient {
    async fn balances(&self, addresses: &[EthAddress]) -> Result<Vec<u128>, ScanError> {
        let batch: Vec<JsonRpcRequest<(String, &'static str)>> = addresses
            .iter()
            .enumerate()
            .map(|(idx, addr)| {
                JsonRpcRequest::new("eth_getBalance", (addr.to_string(), "latest"), idx as u64)
            })
            .collect();

        let responses: Vec<JsonRpcResponse<String>> = self
            .client
            .post(&self.url)
            .json(&batch)
            .send()
            .await?
            .json()
            .await?;

        match_responses(addresses.len(), responses)
    }
}

/// Re-key a batch response by request id and extract the balances in
/// request order
fn match_responses(
    count: usize,
    responses: Vec<JsonRpcResponse<String>>,
) -> Result<Vec<u128>, ScanError> {
    let mut by_id: HashMap<u64, JsonRpcResponse<String>> = responses
        .into_iter()
        .map(|response| (response.id, response))
        .collect();

    (0..count as u64)
        .map(|id| {
            let response = by_id.remove(&id).ok_or(ScanError::MissingResponse(id))?;
            if let Some(error) = response.error {
                return Err(ScanError::Node {
                    code: error.code,
                    message: error.message,
                });
            }
            let raw = response
                .result
                .ok_or_else(|| ScanError::MalformedBalance("missing result".to_string()))?;
            parse_hex_quantity(&raw)
        })
        .collect()
}

/// Parse a JSON-RPC hex quantity ("0x..." or bare hex) into wei
fn parse_hex_quantity(raw: &str) -> Result<u128, ScanError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u128::from_str_radix(digits, 16).map_err(|_| ScanError::MalformedBalance(raw.to_string()))
}
