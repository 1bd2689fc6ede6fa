//! Core type definitions for JSON-RPC transport and request processing.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: what goes over the wire to a
//!   chain provider
//!
//! ## Request Processing Types
//! - [`Request`]: a single on-chain request (data request or withdrawal) owned by one
//!   `(chain, provider)` group
//! - [`ProviderBatch`]: the per-provider unit handed to admission and fulfillment

use alloy::primitives::{Address, Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC protocol version sent with every call.
pub const JSONRPC_VERSION: &str = "2.0";

/// An outgoing JSON-RPC 2.0 call, borrowing its method and params.
///
/// # Example
///
/// ```
/// use oracle_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let params = json!([]);
/// let request = JsonRpcRequest::new("eth_gasPrice", &params, 7);
///
/// assert_eq!(
///     serde_json::to_string(&request).unwrap(),
///     r#"{"jsonrpc":"2.0","method":"eth_gasPrice","params":[],"id":7}"#
/// );
/// ```
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a serde_json::Value,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    #[must_use]
    pub fn new(method: &'a str, params: &'a serde_json::Value, id: u64) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, method, params, id }
    }
}

/// A provider's reply. Carries either a `result` or an `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
///
/// `data` frequently carries the ABI-encoded revert reason for `eth_call` failures.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Kind of on-chain request an airnode serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    /// A data request answered with `fulfill`, `error` or `fail`.
    ApiCall,
    /// A sponsor withdrawal answered with `fulfillWithdrawal`.
    Withdrawal,
}

/// Processing status of a request as seen by this node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting to be fulfilled.
    #[default]
    Pending,
    /// The off-chain part failed; an error report is owed on-chain.
    Errored,
    /// A transaction has been submitted (or the request was answered elsewhere).
    Fulfilled,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Errored => f.write_str("Errored"),
            Self::Fulfilled => f.write_str("Fulfilled"),
        }
    }
}

/// A single request owned by exactly one `(chain, provider)` group.
///
/// `block_number` is the ordering key: lower means older and therefore higher priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: B256,
    pub kind: RequestKind,
    pub chain_id: u64,
    pub provider_name: String,
    pub block_number: u64,
    #[serde(default)]
    pub status: RequestStatus,
    pub airnode: Address,
    pub sponsor: Address,
    /// Requester contract, or the withdrawal destination for withdrawals.
    pub requester: Address,
    #[serde(default)]
    pub fulfill_address: Address,
    #[serde(default)]
    pub fulfill_function_id: FixedBytes<4>,
    /// ABI-encoded response produced by the off-chain call.
    #[serde(default)]
    pub response: Option<Bytes>,
    #[serde(default)]
    pub error_code: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub fulfilled_tx: Option<B256>,
}

impl Request {
    /// Returns `true` if this request still needs a transaction in the current cycle.
    #[must_use]
    pub fn needs_transaction(&self) -> bool {
        self.status != RequestStatus::Fulfilled
    }
}

/// All requests one provider reported for one chain in a cycle.
///
/// Data requests and withdrawals are kept in separate lists, each ordered oldest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBatch {
    pub chain_id: u64,
    pub provider_name: String,
    #[serde(default)]
    pub api_calls: Vec<Request>,
    #[serde(default)]
    pub withdrawals: Vec<Request>,
}

impl ProviderBatch {
    #[must_use]
    pub fn new(chain_id: u64, provider_name: impl Into<String>) -> Self {
        Self { chain_id, provider_name: provider_name.into(), ..Self::default() }
    }

    /// Total number of requests in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.api_calls.len() + self.withdrawals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_calls.is_empty() && self.withdrawals.is_empty()
    }

    /// Iterates over every request in the batch, data requests first.
    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.api_calls.iter().chain(self.withdrawals.iter())
    }
}
