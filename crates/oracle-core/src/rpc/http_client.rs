use crate::rpc::RpcError;
use reqwest::{Client, ClientBuilder};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::{trace, warn};

/// Longest slice of an error body kept in [`RpcError::HttpError`].
const MAX_ERROR_BODY: usize = 256;

/// Limits for the shared transport.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Requests in flight across all providers.
    pub max_in_flight: usize,
    /// How long a request may wait for a free slot before it counts as timed out.
    pub queue_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 256,
            queue_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(30),
        }
    }
}

/// JSON POST transport shared by every provider client of the node.
///
/// One attempt per call. Retry policy belongs to the caller (see [`crate::rpc::retry`]) so each
/// gas strategy and simulation applies its own budget.
pub struct HttpClient {
    client: Client,
    slots: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl HttpClient {
    /// Builds a transport with [`HttpClientConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, RpcError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, RpcError> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("oracle-node/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RpcError::ConnectionFailed(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            slots: Arc::new(Semaphore::new(config.max_in_flight)),
            queue_timeout: config.queue_timeout,
        })
    }

    /// POSTs `body` as JSON to `url` and returns the raw response body.
    ///
    /// `timeout` bounds the request itself, not the wait for a free slot.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Timeout`] if no slot frees up in time or the request times out
    /// - [`RpcError::HttpError`] for a non-2xx status
    /// - [`RpcError::ConnectionFailed`] for any other transport failure
    pub async fn post_json(
        &self,
        url: &str,
        body: bytes::Bytes,
        timeout: Duration,
    ) -> Result<bytes::Bytes, RpcError> {
        let slot = Arc::clone(&self.slots).acquire_owned();
        let _slot = tokio::time::timeout(self.queue_timeout, slot)
            .await
            .map_err(|_| {
                warn!(queue_timeout_ms = self.queue_timeout.as_millis() as u64, "no free http slot");
                RpcError::Timeout
            })?
            .map_err(|_| RpcError::ConcurrencyLimit("transport closed".to_string()))?;

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            trace!(status = status.as_u16(), "provider returned an error status");
            return Err(RpcError::HttpError(status.as_u16(), excerpt(text)));
        }

        response.bytes().await.map_err(transport_error)
    }

    #[cfg(test)]
    fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// Classifies a reqwest failure without echoing the URL, which may carry an API key.
fn transport_error(error: reqwest::Error) -> RpcError {
    if error.is_timeout() {
        return RpcError::Timeout;
    }
    let kind = if error.is_connect() {
        "connection refused or unreachable"
    } else if error.is_body() || error.is_decode() {
        "malformed response body"
    } else {
        "request failed"
    };
    RpcError::ConnectionFailed(kind.to_string())
}

fn excerpt(mut text: String) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text;
    }
    let cut = (0..=MAX_ERROR_BODY).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    text.truncate(cut);
    text.push_str("... (truncated)");
    text
}
