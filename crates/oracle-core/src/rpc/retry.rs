//! Bounded retries with jitter for RPC-backed operations.

use crate::rpc::RpcError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tokio::time::Instant;
use tracing::debug;

/// Retry budget applied to every RPC-backed gas strategy and simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Upper bound for a single attempt.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retries() -> u32 {
    2
}

fn default_attempt_timeout_ms() -> u64 {
    4_000
}

fn default_min_delay_ms() -> u64 {
    20
}

fn default_max_delay_ms() -> u64 {
    100
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Random delay in `[min_delay_ms, max_delay_ms]`.
    fn jittered_delay(&self) -> Duration {
        let upper = self.max_delay_ms.max(self.min_delay_ms);
        Duration::from_millis(rand::rng().random_range(self.min_delay_ms..=upper))
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the budget is spent.
///
/// Each attempt is bounded by `attempt_timeout_ms` and, when given, by the time left until
/// `deadline`. Only transient errors are retried; an execution revert is returned immediately.
///
/// # Errors
///
/// Returns the last attempt's error, or [`RpcError::Timeout`] if the deadline has passed.
pub async fn with_retries<T, F, Fut>(
    config: &RetryConfig,
    deadline: Option<Instant>,
    mut operation: F,
) -> Result<T, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let attempt_timeout = Duration::from_millis(config.attempt_timeout_ms);
    let mut attempt = 0u32;

    loop {
        let budget = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(RpcError::Timeout);
                }
                left.min(attempt_timeout)
            }
            None => attempt_timeout,
        };

        let result =
            tokio::time::timeout(budget, operation()).await.unwrap_or(Err(RpcError::Timeout));

        match result {
            Ok(value) => return Ok(value),
            Err(error) if attempt < config.retries && error.is_transient() => {
                attempt += 1;
                let delay = config.jittered_delay();
                if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
                    return Err(error);
                }
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying rpc call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
