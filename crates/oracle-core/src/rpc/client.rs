use crate::{
    rpc::{
        block::{parse_quantity, parse_quantity_u64, Block, BlockRef, BlockTag},
        HttpClient, RpcError,
    },
    types::{JsonRpcRequest, JsonRpcResponse},
};
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::trace;

/// Read-only call parameters for `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
}

/// The chain operations the node depends on.
///
/// Implemented over HTTP by [`JsonRpcClient`]; unit tests provide in-memory implementations.
/// Each method makes a single attempt. Callers decide on retries.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Name of the provider behind this client, used in log entries.
    fn provider_name(&self) -> &str;

    /// `eth_gasPrice`, in wei.
    async fn gas_price(&self) -> Result<u128, RpcError>;

    /// `eth_getBlockByNumber` with full transaction objects. `None` if the block is unknown.
    async fn block_with_transactions(&self, block: BlockRef) -> Result<Option<Block>, RpcError>;

    /// `eth_call` against the latest block, returning the raw return data.
    async fn call(&self, call: &CallRequest) -> Result<Bytes, RpcError>;

    /// `eth_sendRawTransaction`, returning the transaction hash.
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError>;

    /// `eth_getBalance` at the latest block, in wei.
    async fn balance(&self, address: Address) -> Result<U256, RpcError>;

    /// `eth_getTransactionCount` including pending transactions.
    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    /// `eth_chainId`.
    async fn chain_id(&self) -> Result<u64, RpcError>;
}

/// JSON-RPC 2.0 client for one provider endpoint.
pub struct JsonRpcClient {
    name: Arc<str>,
    url: String,
    http: Arc<HttpClient>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    #[must_use]
    pub fn new(
        name: impl Into<Arc<str>>,
        url: impl Into<String>,
        http: Arc<HttpClient>,
        timeout: Duration,
    ) -> Self {
        Self { name: name.into(), url: url.into(), http, timeout, next_id: AtomicU64::new(1) }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, &params, id);
        let body = serde_json::to_vec(&request)
            .map_err(|e| RpcError::InvalidRequest(format!("failed to encode {method}: {e}")))?;

        trace!(provider = %self.name, method, id, "sending rpc request");
        let raw = self.http.post_json(&self.url, body.into(), self.timeout).await?;

        let response: JsonRpcResponse = serde_json::from_slice(&raw)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = response.error {
            return Err(RpcError::JsonRpc(error.code, error.message));
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method} result: {e}")))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, RpcError> {
        let raw: String = self.request(method, params).await?;
        parse_quantity(&raw).map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }
}

#[async_trait]
impl ChainRpc for JsonRpcClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    async fn block_with_transactions(&self, block: BlockRef) -> Result<Option<Block>, RpcError> {
        self.request("eth_getBlockByNumber", json!([block.to_string(), true])).await
    }

    async fn call(&self, call: &CallRequest) -> Result<Bytes, RpcError> {
        let params = json!([call, BlockRef::Tag(BlockTag::Latest).to_string()]);
        self.request("eth_call", params).await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError> {
        self.request("eth_sendRawTransaction", json!([raw])).await
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        let params = json!([address, BlockRef::Tag(BlockTag::Latest).to_string()]);
        self.request("eth_getBalance", params).await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        let params = json!([address, BlockRef::Tag(BlockTag::Pending).to_string()]);
        let raw: String = self.request("eth_getTransactionCount", params).await?;
        parse_quantity_u64(&raw)
            .map_err(|e| RpcError::InvalidResponse(format!("eth_getTransactionCount: {e}")))
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity_u64(&raw).map_err(|e| RpcError::InvalidResponse(format!("eth_chainId: {e}")))
    }
}
