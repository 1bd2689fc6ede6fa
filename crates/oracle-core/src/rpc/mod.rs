//! Chain RPC plumbing: HTTP transport, JSON-RPC client, error classification and retries.

pub mod block;
pub mod client;
pub mod errors;
pub mod http_client;
pub mod retry;

pub use block::{Block, BlockRef, BlockTag, BlockTransaction};
pub use client::{CallRequest, ChainRpc, JsonRpcClient};
pub use errors::{RpcError, RpcErrorCategory};
pub use http_client::{HttpClient, HttpClientConfig};
pub use retry::{with_retries, RetryConfig};
