//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: the `default_*` helpers below
//! 2. **Config file**: TOML file named by the `ORACLE_CONFIG` env var, `config/config.toml`
//!    otherwise
//! 3. **Environment variables**: `ORACLE__SECTION__FIELD` overrides a single field
//!
//! The signing key is never read from the file in practice; set it with
//! `ORACLE__NODE__PRIVATE_KEY`.
//!
//! # Example
//!
//! ```toml
//! [node]
//! cycle_interval_seconds = 60
//!
//! [[chains]]
//! id = 31337
//! rrp_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! max_concurrency = 10
//!
//! [[chains.providers]]
//! name = "local"
//! url = "http://127.0.0.1:8545"
//!
//! [[chains.gas_price_oracle]]
//! strategy = "provider_recommended"
//! multiplier = 1.1
//!
//! [[chains.gas_price_oracle]]
//! strategy = "constant"
//! gas_price = { value = 10, unit = "gwei" }
//! ```

use crate::{
    beacon::{percent_to_ppm, ConsensusSettings},
    gas::{GasConfigError, GasStrategy},
    rpc::RetryConfig,
};
use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    net::SocketAddr,
    path::Path,
    time::Duration,
};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("no chains configured")]
    NoChains,
    #[error("chain {0} is configured more than once")]
    DuplicateChain(u64),
    #[error("chain {0} has no providers")]
    NoProviders(u64),
    #[error("provider {provider} on chain {chain_id} is configured more than once")]
    DuplicateProvider { chain_id: u64, provider: String },
    #[error("invalid URL for provider {provider} on chain {chain_id}: {url}")]
    InvalidProviderUrl { chain_id: u64, provider: String, url: String },
    #[error("invalid gas price oracle for chain {chain_id}: {source}")]
    GasOracle { chain_id: u64, source: GasConfigError },
    #[error("{0} must be greater than 0")]
    Zero(&'static str),
    #[error("deviation threshold must be a positive percentage, got {0}")]
    InvalidThreshold(f64),
    #[error("logging format must be 'json' or 'pretty', got {0:?}")]
    InvalidLoggingFormat(String),
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
    #[error("node.private_key is not set")]
    MissingPrivateKey,
    #[error("node.private_key is not a valid secp256k1 key")]
    InvalidPrivateKey,
}

/// Hex private key. Redacted in debug output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Processing loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Seconds between the start of two cycles. Defaults to `60`.
    #[serde(default = "default_cycle_interval_seconds")]
    pub cycle_interval_seconds: u64,

    /// Outer budget for one provider's whole cycle. Defaults to `40`.
    #[serde(default = "default_provider_timeout_seconds")]
    pub provider_timeout_seconds: u64,

    /// Budget for gas price resolution, measured from the start of the provider's cycle.
    /// Defaults to `10`.
    #[serde(default = "default_gas_oracle_timeout_seconds")]
    pub gas_oracle_timeout_seconds: u64,

    /// JSON file holding the pending provider batches. Defaults to `data/requests.json`.
    #[serde(default = "default_requests_path")]
    pub requests_path: String,

    /// Key that signs every transaction the node sends.
    #[serde(default)]
    pub private_key: Option<SecretKey>,
}

fn default_cycle_interval_seconds() -> u64 {
    60
}

fn default_provider_timeout_seconds() -> u64 {
    40
}

fn default_gas_oracle_timeout_seconds() -> u64 {
    10
}

fn default_requests_path() -> String {
    "data/requests.json".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cycle_interval_seconds: default_cycle_interval_seconds(),
            provider_timeout_seconds: default_provider_timeout_seconds(),
            gas_oracle_timeout_seconds: default_gas_oracle_timeout_seconds(),
            requests_path: default_requests_path(),
            private_key: None,
        }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// The `sign-beacon-update` HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum beacon age in seconds. Defaults to `120`.
    #[serde(default = "default_staleness_seconds")]
    pub staleness_seconds: u64,

    /// Maximum `(max - min) / |min|` of an accepted quorum, in percent. Defaults to `2.5`.
    #[serde(default = "default_deviation_threshold_percent")]
    pub deviation_threshold_percent: f64,
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

fn default_staleness_seconds() -> u64 {
    crate::beacon::DEFAULT_STALENESS_SECONDS
}

fn default_deviation_threshold_percent() -> f64 {
    crate::beacon::DEFAULT_DEVIATION_THRESHOLD_PERCENT
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            staleness_seconds: default_staleness_seconds(),
            deviation_threshold_percent: default_deviation_threshold_percent(),
        }
    }
}

impl SigningConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if the address and port do not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.bind_address, self.bind_port);
        raw.parse().map_err(|_| ConfigError::InvalidBindAddress(raw))
    }

    #[must_use]
    pub fn consensus_settings(&self) -> ConsensusSettings {
        ConsensusSettings {
            staleness_seconds: self.staleness_seconds,
            deviation_threshold_ppm: percent_to_ppm(self.deviation_threshold_percent),
        }
    }
}

/// Prometheus metrics export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Defaults to `false`.
    #[serde(default)]
    pub enabled: bool,

    /// Port for the `/metrics` listener. Defaults to `9090`.
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

fn default_prometheus_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: false, prometheus_port: default_prometheus_port() }
    }
}

/// One JSON-RPC endpoint of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in logs and in request batches.
    pub name: String,

    /// HTTP(S) endpoint URL.
    pub url: String,

    /// Per-request HTTP timeout. Defaults to `10`.
    #[serde(default = "default_provider_request_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_provider_request_timeout_seconds() -> u64 {
    10
}

impl ProviderConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: u64,

    /// Address of the request-response protocol contract.
    pub rrp_address: Address,

    /// Upper bound on requests worked on per cycle, across all providers. Defaults to `100`.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Gas limit of every fulfillment transaction. Defaults to `500000`.
    #[serde(default = "default_fulfillment_gas_limit")]
    pub fulfillment_gas_limit: u64,

    /// Ordered strategies. Must include a constant.
    pub gas_price_oracle: Vec<GasStrategy>,

    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_concurrency() -> usize {
    100
}

fn default_fulfillment_gas_limit() -> u64 {
    500_000
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

impl AppConfig {
    /// Loads configuration from `config_path` layered over defaults and under `ORACLE__*`
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("node.cycle_interval_seconds", default_cycle_interval_seconds())?
            .set_default("node.provider_timeout_seconds", default_provider_timeout_seconds())?
            .set_default("node.gas_oracle_timeout_seconds", default_gas_oracle_timeout_seconds())?
            .set_default("node.requests_path", default_requests_path())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .set_default("signing.enabled", true)?
            .set_default("signing.bind_address", default_bind_address())?
            .set_default("signing.bind_port", default_bind_port())?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.prometheus_port", default_prometheus_port())?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("ORACLE").prefix_separator("__").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Loads from the path in `ORACLE_CONFIG`, or `config/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ORACLE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(path)
    }

    /// Validates everything serde cannot.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::NoChains);
        }

        let mut chain_ids = HashSet::new();
        for chain in &self.chains {
            if !chain_ids.insert(chain.id) {
                return Err(ConfigError::DuplicateChain(chain.id));
            }
            validate_chain(chain)?;
        }

        if self.node.cycle_interval_seconds == 0 {
            return Err(ConfigError::Zero("node.cycle_interval_seconds"));
        }
        if self.node.provider_timeout_seconds == 0 {
            return Err(ConfigError::Zero("node.provider_timeout_seconds"));
        }
        if self.node.gas_oracle_timeout_seconds == 0 {
            return Err(ConfigError::Zero("node.gas_oracle_timeout_seconds"));
        }

        let threshold = self.signing.deviation_threshold_percent;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        if self.signing.enabled {
            self.signing.socket_addr()?;
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidLoggingFormat(self.logging.format.clone()));
        }

        Ok(())
    }

    /// `max_concurrency` keyed by chain id, as admission control expects it.
    #[must_use]
    pub fn chain_limits(&self) -> HashMap<u64, usize> {
        self.chains.iter().map(|chain| (chain.id, chain.max_concurrency)).collect()
    }

    #[must_use]
    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|chain| chain.id == chain_id)
    }

    /// Parses `node.private_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPrivateKey`] or [`ConfigError::InvalidPrivateKey`].
    pub fn signing_key(&self) -> Result<PrivateKeySigner, ConfigError> {
        let key = self.node.private_key.as_ref().ok_or(ConfigError::MissingPrivateKey)?;
        key.0.trim().parse().map_err(|_| ConfigError::InvalidPrivateKey)
    }

    #[must_use]
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.node.cycle_interval_seconds)
    }
}

fn validate_chain(chain: &ChainConfig) -> Result<(), ConfigError> {
    if chain.providers.is_empty() {
        return Err(ConfigError::NoProviders(chain.id));
    }

    let mut names = HashSet::new();
    for provider in &chain.providers {
        if !names.insert(provider.name.as_str()) {
            return Err(ConfigError::DuplicateProvider {
                chain_id: chain.id,
                provider: provider.name.clone(),
            });
        }
        if !(provider.url.starts_with("http://") || provider.url.starts_with("https://")) {
            return Err(ConfigError::InvalidProviderUrl {
                chain_id: chain.id,
                provider: provider.name.clone(),
                url: provider.url.clone(),
            });
        }
        if provider.timeout_seconds == 0 {
            return Err(ConfigError::Zero("providers.timeout_seconds"));
        }
    }

    if chain.fulfillment_gas_limit == 0 {
        return Err(ConfigError::Zero("fulfillment_gas_limit"));
    }

    let gas_error = |source| ConfigError::GasOracle { chain_id: chain.id, source };
    for strategy in &chain.gas_price_oracle {
        strategy.validate().map_err(gas_error)?;
    }
    if !chain.gas_price_oracle.iter().any(|s| matches!(s, GasStrategy::Constant { .. })) {
        return Err(gas_error(GasConfigError::MissingConstant(chain.id)));
    }

    Ok(())
}
