//! Test Helper Functions and Utilities
//!
//! Common helpers for creating test data and fixtures.

use alloy::{
    primitives::{Address, Bytes, FixedBytes, B256},
    signers::local::PrivateKeySigner,
};
use oracle_core::{
    rpc::{HttpClient, JsonRpcClient, RetryConfig},
    types::{Request, RequestKind, RequestStatus},
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

/// First well-known development account.
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_ID: u64 = 31337;

/// Address of the request-response contract in fixtures.
#[must_use]
pub fn rrp_address() -> Address {
    Address::repeat_byte(0x5f)
}

#[must_use]
pub fn dev_signer() -> PrivateKeySigner {
    DEV_KEY.parse().expect("dev key parses")
}

/// A short retry budget so failing providers do not slow the suite down.
#[must_use]
pub fn fast_retry() -> RetryConfig {
    RetryConfig { retries: 2, attempt_timeout_ms: 2_000, min_delay_ms: 1, max_delay_ms: 5 }
}

/// A JSON-RPC client pointed at a mock server.
#[must_use]
pub fn client_for(name: &str, url: String) -> JsonRpcClient {
    let http = Arc::new(HttpClient::new().expect("http client builds"));
    JsonRpcClient::new(name, url, http, Duration::from_secs(5))
}

/// A block whose transactions are all legacy, priced at `gas_prices` wei.
#[must_use]
pub fn legacy_block(number: u64, gas_prices: &[u128]) -> Value {
    let transactions: Vec<Value> = gas_prices
        .iter()
        .map(|price| json!({ "type": "0x0", "gasPrice": format!("0x{price:x}") }))
        .collect();

    json!({
        "number": format!("0x{number:x}"),
        "hash": format!("0x{number:064x}"),
        "transactions": transactions,
    })
}

/// A post-London block with the given base fee and EIP-1559 transactions.
///
/// Each entry is `(max_fee_per_gas, max_priority_fee_per_gas)`.
#[must_use]
pub fn eip1559_block(number: u64, base_fee: u128, fees: &[(u128, u128)]) -> Value {
    let transactions: Vec<Value> = fees
        .iter()
        .map(|(max_fee, priority)| {
            json!({
                "type": "0x2",
                "maxFeePerGas": format!("0x{max_fee:x}"),
                "maxPriorityFeePerGas": format!("0x{priority:x}"),
            })
        })
        .collect();

    json!({
        "number": format!("0x{number:x}"),
        "hash": format!("0x{number:064x}"),
        "baseFeePerGas": format!("0x{base_fee:x}"),
        "transactions": transactions,
    })
}

/// Builder for requests as the node stores them between cycles.
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// A pending data request with a response, reported by `provider` at `block_number`.
    #[must_use]
    pub fn api_call(id: u8, provider: &str, block_number: u64) -> Self {
        Self {
            request: Request {
                id: B256::repeat_byte(id),
                kind: RequestKind::ApiCall,
                chain_id: CHAIN_ID,
                provider_name: provider.to_string(),
                block_number,
                status: RequestStatus::Pending,
                airnode: Address::repeat_byte(0xaa),
                sponsor: Address::repeat_byte(0xbb),
                requester: Address::repeat_byte(0xcc),
                fulfill_address: Address::repeat_byte(0xdd),
                fulfill_function_id: FixedBytes::from([0x12, 0x34, 0x56, 0x78]),
                response: Some(Bytes::from(vec![0u8; 32])),
                error_code: None,
                error_message: None,
                nonce: None,
                fulfilled_tx: None,
            },
        }
    }

    /// A pending withdrawal reported by `provider` at `block_number`.
    #[must_use]
    pub fn withdrawal(id: u8, provider: &str, block_number: u64) -> Self {
        let mut builder = Self::api_call(id, provider, block_number);
        builder.request.kind = RequestKind::Withdrawal;
        builder.request.response = None;
        builder
    }

    #[must_use]
    pub fn chain(mut self, chain_id: u64) -> Self {
        self.request.chain_id = chain_id;
        self
    }

    #[must_use]
    pub fn status(mut self, status: RequestStatus) -> Self {
        self.request.status = status;
        self
    }

    #[must_use]
    pub fn no_response(mut self) -> Self {
        self.request.response = None;
        self
    }

    #[must_use]
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.request.nonce = Some(nonce);
        self
    }

    #[must_use]
    pub fn build(self) -> Request {
        self.request
    }
}
