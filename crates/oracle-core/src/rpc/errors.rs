use thiserror::Error;

/// Classification of JSON-RPC errors returned by a chain provider.
///
/// The category decides whether a call is worth repeating:
/// - Provider errors and rate limits are transient and retried
/// - Execution errors mean the call itself would revert and are never retried verbatim
/// - Client and parse errors are permanent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCategory {
    /// Invalid request, method not found, invalid params.
    ClientError,
    /// Internal or server errors on the provider side.
    ProviderError,
    /// Rate limiting at JSON-RPC level (-32005).
    RateLimit,
    /// Malformed response or request payload.
    ParseError,
    /// Reverts, out of gas, nonce and funding problems.
    ExecutionError,
}

impl RpcErrorCategory {
    /// Classifies a JSON-RPC error code and message into a category.
    ///
    /// Code `3` is the geth convention for `execution reverted` with revert data attached. In the
    /// `-32000..=-32099` server range the message is inspected, since providers report both
    /// reverts and their own failures there.
    #[must_use]
    pub fn from_code_and_message(code: i32, message: &str) -> Self {
        match code {
            3 => Self::ExecutionError,
            -32700 => Self::ParseError,
            -32602..=-32600 => Self::ClientError,
            -32603 => Self::ProviderError,
            -32005 => Self::RateLimit,
            -32099..=-32000 => {
                let message_lower = message.to_lowercase();
                if message_lower.contains("execution reverted") ||
                    message_lower.contains("out of gas") ||
                    message_lower.contains("revert") ||
                    message_lower.contains("insufficient funds") ||
                    message_lower.contains("nonce too low") ||
                    message_lower.contains("gas too low")
                {
                    Self::ExecutionError
                } else {
                    Self::ProviderError
                }
            }
            _ => Self::ProviderError,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ProviderError)
    }

    /// Returns a static string representation for log fields and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientError => "client_error",
            Self::ProviderError => "provider_error",
            Self::RateLimit => "rate_limit",
            Self::ParseError => "parse_error",
            Self::ExecutionError => "execution_error",
        }
    }
}

/// Errors that can occur when talking to a chain provider.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RpcError {
    /// The request, or the permit to send it, exceeded its time budget.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the provider.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx HTTP status. First field is the status code.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error object returned by the provider.
    #[error("RPC error {0}: {1}")]
    JsonRpc(i32, String),

    /// Response could not be parsed or had an unexpected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request could not be built before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client's concurrency semaphore was closed.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),
}

impl RpcError {
    /// Returns the JSON-RPC error category if this is a JSON-RPC error.
    #[must_use]
    pub fn rpc_category(&self) -> Option<RpcErrorCategory> {
        match self {
            Self::JsonRpc(code, message) => {
                Some(RpcErrorCategory::from_code_and_message(*code, message))
            }
            _ => None,
        }
    }

    /// Returns `true` if repeating the same call may succeed.
    ///
    /// Timeouts, connection problems, 5xx and 429 responses, and transient JSON-RPC categories
    /// qualify.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout |
            Self::ConnectionFailed(_) |
            Self::ConcurrencyLimit(_) => true,
            Self::HttpError(status, _) => (500..=599).contains(status) || *status == 429,
            Self::JsonRpc(_, _) => self.rpc_category().is_some_and(|cat| cat.is_transient()),
            Self::InvalidResponse(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Returns `true` if retrying won't help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Returns `true` if the provider reported that the call would revert.
    #[must_use]
    pub fn is_execution_revert(&self) -> bool {
        self.rpc_category() == Some(RpcErrorCategory::ExecutionError)
    }
}
