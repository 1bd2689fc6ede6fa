//! RPC Mock Builder for Ethereum JSON-RPC Testing
//!
//! Wraps mockito to answer the handful of methods the oracle node calls.

use alloy::primitives::hex;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for a mock chain provider.
///
/// Mocks are matched on the JSON-RPC method (and for some methods on the params), so several
/// can live on one server as long as their matchers do not overlap.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
    expectations: Vec<Mock>,
}

impl RpcMockBuilder {
    /// Creates a new RPC mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new(), expectations: Vec::new() }
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    fn method_matcher(method: &str) -> Matcher {
        Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
    }

    fn result_body(result: &Value) -> String {
        json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
    }

    fn error_body(code: i32, message: &str) -> String {
        json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
            .to_string()
    }

    fn respond(&mut self, matcher: Matcher, body: String) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(matcher)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks `eth_gasPrice`.
    pub fn mock_gas_price(&mut self, wei: u128) -> &mut Self {
        let body = Self::result_body(&json!(format!("0x{wei:x}")));
        self.respond(Self::method_matcher("eth_gasPrice"), body)
    }

    /// Mocks `eth_getBlockByNumber` for the `latest` tag.
    pub fn mock_latest_block(&mut self, block: &Value) -> &mut Self {
        let matcher = Matcher::Regex(
            r#""method"\s*:\s*"eth_getBlockByNumber".*"params"\s*:\s*\["latest""#.to_string(),
        );
        self.respond(matcher, Self::result_body(block))
    }

    /// Mocks `eth_getBlockByNumber` for a specific block number.
    pub fn mock_block_by_number(&mut self, number: u64, block: &Value) -> &mut Self {
        let matcher = Matcher::Regex(format!(
            r#""method"\s*:\s*"eth_getBlockByNumber".*"params"\s*:\s*\["0x{number:x}""#
        ));
        self.respond(matcher, Self::result_body(block))
    }

    /// Mocks `eth_call` for call data starting with `selector`, returning `output`.
    pub fn mock_call_result(&mut self, selector: [u8; 4], output: &[u8]) -> &mut Self {
        let body = Self::result_body(&json!(hex::encode_prefixed(output)));
        self.respond(Self::call_matcher(selector), body)
    }

    /// Mocks `eth_call` for call data starting with `selector` reverting (geth code 3).
    pub fn mock_call_revert(&mut self, selector: [u8; 4], reason: &str) -> &mut Self {
        let body = Self::error_body(3, &format!("execution reverted: {reason}"));
        self.respond(Self::call_matcher(selector), body)
    }

    fn call_matcher(selector: [u8; 4]) -> Matcher {
        Matcher::Regex(format!(
            r#""method"\s*:\s*"eth_call".*"data"\s*:\s*"0x{}"#,
            hex::encode(selector)
        ))
    }

    /// Mocks `eth_sendRawTransaction`, expecting exactly `hits` submissions.
    ///
    /// Checked by [`Self::verify`].
    pub fn expect_send_raw_transaction(&mut self, tx_hash: &str, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Self::method_matcher("eth_sendRawTransaction"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Self::result_body(&json!(tx_hash)))
            .expect(hits)
            .create();

        self.expectations.push(mock);
        self
    }

    /// Mocks `eth_getBalance`.
    pub fn mock_balance(&mut self, wei: u128) -> &mut Self {
        let body = Self::result_body(&json!(format!("0x{wei:x}")));
        self.respond(Self::method_matcher("eth_getBalance"), body)
    }

    /// Mocks `eth_getTransactionCount`.
    pub fn mock_transaction_count(&mut self, count: u64) -> &mut Self {
        let body = Self::result_body(&json!(format!("0x{count:x}")));
        self.respond(Self::method_matcher("eth_getTransactionCount"), body)
    }

    /// Mocks a JSON-RPC error object for `method`.
    pub fn mock_rpc_error(&mut self, method: &str, code: i32, message: &str) -> &mut Self {
        self.respond(Self::method_matcher(method), Self::error_body(code, message))
    }

    /// Mocks a bare HTTP failure for `method`, expecting exactly `hits` attempts.
    ///
    /// Checked by [`Self::verify`].
    pub fn expect_http_error(&mut self, method: &str, status: usize, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Self::method_matcher(method))
            .with_status(status)
            .with_body("upstream unavailable")
            .expect(hits)
            .create();

        self.expectations.push(mock);
        self
    }

    /// Asserts every `expect_*` mock was hit the expected number of times.
    pub async fn verify(&self) {
        for mock in &self.expectations {
            mock.assert_async().await;
        }
    }
}
