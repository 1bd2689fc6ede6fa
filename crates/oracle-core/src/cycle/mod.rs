//! One processing cycle across every configured chain and provider.
//!
//! ```text
//! batches ─▶ admission (per chain) ─▶ per provider, concurrently, under a timeout:
//!                                       gas target ─▶ nonces ─▶ fulfill each request
//! ```
//!
//! RPC work inside a provider stops at a deadline set [`SUBMISSION_HEADROOM`] before the provider
//! timeout, so transactions already sent are kept. A provider that still exceeds its budget
//! contributes nothing: its admitted batch is returned as it was before processing, so the same
//! work is picked up again next cycle.
//!
//! All providers of a chain sign with the same key. Nonce ranges are reserved per chain under a
//! lock, so two providers never hand out the same nonce in one cycle.

use crate::{
    admission::{apply_chain_limits, BatchesByChain},
    config::{AppConfig, ConfigError},
    fulfillment::{assign_nonces, Fulfiller, TransactionSigner},
    gas::{GasPriceOracle, GasTarget},
    logging::CycleLog,
    rpc::{with_retries, ChainRpc, HttpClient, JsonRpcClient, RetryConfig},
    telemetry,
    types::{ProviderBatch, Request},
};
use alloy::{primitives::B256, signers::local::PrivateKeySigner};
use futures::future::join_all;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::Mutex,
    time::{timeout, Instant},
};
use tracing::{error, info, warn};

/// Time kept free at the end of a provider's budget for the last submission to complete.
pub const SUBMISSION_HEADROOM: Duration = Duration::from_secs(1);

/// Next free nonce per chain, shared by that chain's providers for one cycle.
type NonceReservations = HashMap<u64, Mutex<Option<u64>>>;

/// Everything needed to process one chain's requests.
pub struct ChainRuntime {
    pub chain_id: u64,
    pub max_concurrency: usize,
    pub oracle: GasPriceOracle,
    pub fulfiller: Fulfiller,
    pub retry: RetryConfig,
    providers: HashMap<String, Arc<dyn ChainRpc>>,
}

impl ChainRuntime {
    #[must_use]
    pub fn new(
        chain_id: u64,
        max_concurrency: usize,
        oracle: GasPriceOracle,
        fulfiller: Fulfiller,
        retry: RetryConfig,
    ) -> Self {
        Self { chain_id, max_concurrency, oracle, fulfiller, retry, providers: HashMap::new() }
    }

    /// Registers a provider under its [`ChainRpc::provider_name`].
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ChainRpc>) -> Self {
        self.providers.insert(provider.provider_name().to_string(), provider);
        self
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&Arc<dyn ChainRpc>> {
        self.providers.get(name)
    }
}

/// Result of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Admitted batches after processing, grouped by chain in ascending id order.
    pub batches: Vec<ProviderBatch>,
    /// Requests admission control held back this cycle, untouched.
    pub deferred: Vec<Request>,
    pub log: CycleLog,
}

/// Runs admission, gas resolution and fulfillment for every chain.
pub struct CycleRunner {
    chains: HashMap<u64, ChainRuntime>,
    provider_timeout: Duration,
    gas_oracle_timeout: Duration,
}

impl CycleRunner {
    #[must_use]
    pub fn new(provider_timeout: Duration, gas_oracle_timeout: Duration) -> Self {
        Self { chains: HashMap::new(), provider_timeout, gas_oracle_timeout }
    }

    #[must_use]
    pub fn with_chain(mut self, chain: ChainRuntime) -> Self {
        self.chains.insert(chain.chain_id, chain);
        self
    }

    /// Builds a runner with one [`JsonRpcClient`] per configured provider, all sharing `http`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::GasOracle`] if a chain's gas price oracle is invalid.
    pub fn from_config(
        config: &AppConfig,
        signer: &PrivateKeySigner,
        http: Arc<HttpClient>,
    ) -> Result<Self, ConfigError> {
        let mut runner = Self::new(
            Duration::from_secs(config.node.provider_timeout_seconds),
            Duration::from_secs(config.node.gas_oracle_timeout_seconds),
        );

        for chain in &config.chains {
            let oracle = GasPriceOracle::new(
                chain.id,
                chain.gas_price_oracle.clone(),
                chain.fulfillment_gas_limit,
                chain.retry.clone(),
            )
            .map_err(|source| ConfigError::GasOracle { chain_id: chain.id, source })?;
            let fulfiller = Fulfiller::new(
                chain.rrp_address,
                TransactionSigner::new(signer.clone(), chain.id),
                chain.retry.clone(),
            );

            let mut runtime = ChainRuntime::new(
                chain.id,
                chain.max_concurrency,
                oracle,
                fulfiller,
                chain.retry.clone(),
            );
            for provider in &chain.providers {
                let client = JsonRpcClient::new(
                    provider.name.as_str(),
                    provider.url.clone(),
                    Arc::clone(&http),
                    provider.timeout(),
                );
                runtime = runtime.with_provider(Arc::new(client));
            }
            runner = runner.with_chain(runtime);
        }

        Ok(runner)
    }

    fn chain_limits(&self) -> HashMap<u64, usize> {
        self.chains.values().map(|chain| (chain.chain_id, chain.max_concurrency)).collect()
    }

    /// Runs one cycle over `batches`.
    ///
    /// Providers are processed concurrently, each bounded by the provider timeout. Logs are
    /// flushed to `tracing` per chain and provider and also returned in the report, admission
    /// entries first.
    pub async fn run_cycle(&self, batches: Vec<ProviderBatch>) -> CycleReport {
        let mut by_chain = BatchesByChain::new();
        for batch in batches {
            by_chain.entry(batch.chain_id).or_default().push(batch);
        }

        let limits = self.chain_limits();
        let mut report = CycleReport::default();
        let mut admitted = Vec::new();

        for (chain_id, chain_batches) in by_chain {
            let submitted: Vec<Request> =
                chain_batches.iter().flat_map(|batch| batch.requests().cloned()).collect();

            let (pruned, log) = apply_chain_limits(&limits, BTreeMap::from([(chain_id, chain_batches)]));
            log.flush_to_tracing(chain_id, "admission");
            report.log.append(log);

            let kept: Vec<ProviderBatch> = pruned.into_values().flatten().collect();
            let kept_ids: HashSet<B256> =
                kept.iter().flat_map(|batch| batch.requests().map(|request| request.id)).collect();
            report
                .deferred
                .extend(submitted.into_iter().filter(|request| !kept_ids.contains(&request.id)));
            admitted.extend(kept);
        }

        let reservations: NonceReservations =
            admitted.iter().map(|batch| (batch.chain_id, Mutex::new(None))).collect();
        let started = Instant::now();
        let results = join_all(
            admitted.into_iter().map(|batch| self.run_provider(batch, &reservations, started)),
        )
        .await;

        for (batch, log) in results {
            report.log.append(log);
            report.batches.push(batch);
        }

        report
    }

    async fn run_provider(
        &self,
        batch: ProviderBatch,
        reservations: &NonceReservations,
        started: Instant,
    ) -> (ProviderBatch, CycleLog) {
        let chain_id = batch.chain_id;
        let provider_name = batch.provider_name.clone();

        let Some(chain) = self.chains.get(&chain_id) else {
            warn!(chain_id, provider = %provider_name, "no chain configured for batch, skipping");
            return (batch, CycleLog::new());
        };
        let Some(rpc) = chain.provider(&provider_name) else {
            warn!(chain_id, provider = %provider_name, "no provider configured for batch, skipping");
            return (batch, CycleLog::new());
        };

        let Some(next_nonce) = reservations.get(&chain_id) else {
            return (batch, CycleLog::new());
        };

        let original = batch.clone();
        let deadline = started + self.provider_timeout.saturating_sub(SUBMISSION_HEADROOM);
        let processing =
            self.process_provider(chain, rpc.as_ref(), batch, next_nonce, started, deadline);
        match timeout(self.provider_timeout, processing).await {
            Ok((processed, log)) => {
                log.flush_to_tracing(chain_id, &provider_name);
                (processed, log)
            }
            Err(_) => {
                telemetry::record_provider_timeout(chain_id, &provider_name);
                error!(
                    chain_id,
                    provider = %provider_name,
                    timeout_secs = self.provider_timeout.as_secs(),
                    "provider cycle timed out, discarding its results"
                );
                let mut log = CycleLog::new();
                log.error(format!(
                    "Processing for provider:{provider_name} on chain:{chain_id} timed out after {}s",
                    self.provider_timeout.as_secs()
                ));
                (original, log)
            }
        }
    }

    async fn process_provider(
        &self,
        chain: &ChainRuntime,
        rpc: &dyn ChainRpc,
        mut batch: ProviderBatch,
        next_nonce: &Mutex<Option<u64>>,
        started: Instant,
        deadline: Instant,
    ) -> (ProviderBatch, CycleLog) {
        let mut log = CycleLog::new();

        if !batch.requests().any(Request::needs_transaction) {
            log.debug(format!("No pending requests for provider:{}", batch.provider_name));
            return (batch, log);
        }

        let gas = chain.oracle.resolve(rpc, started + self.gas_oracle_timeout, &mut log).await;

        let sender = chain.fulfiller.sender();
        let (first_nonce, end_nonce) = {
            let mut reserved = next_nonce.lock().await;
            let fetched =
                with_retries(&chain.retry, Some(deadline), || rpc.transaction_count(sender)).await;
            let pending = match fetched {
                Ok(nonce) => nonce,
                Err(e) => {
                    log.error(format!(
                        "Unable to fetch transaction count for {sender} on provider:{}: {e}",
                        batch.provider_name
                    ));
                    return (batch, log);
                }
            };
            let first = reserved.map_or(pending, |next| next.max(pending));
            let end = assign_nonces(&mut batch, first);
            *reserved = Some(end);
            (first, end)
        };
        info!(
            chain_id = chain.chain_id,
            provider = %batch.provider_name,
            first_nonce,
            transactions = end_nonce - first_nonce,
            "assigned nonces"
        );

        let api_calls = std::mem::take(&mut batch.api_calls);
        let withdrawals = std::mem::take(&mut batch.withdrawals);
        let (api_calls, withdrawals) = futures::join!(
            fulfill_all(&chain.fulfiller, rpc, api_calls, &gas, deadline),
            fulfill_all(&chain.fulfiller, rpc, withdrawals, &gas, deadline),
        );

        for (request, request_log) in api_calls {
            log.append(request_log);
            batch.api_calls.push(request);
        }
        for (request, request_log) in withdrawals {
            log.append(request_log);
            batch.withdrawals.push(request);
        }

        (batch, log)
    }
}

async fn fulfill_all(
    fulfiller: &Fulfiller,
    rpc: &dyn ChainRpc,
    requests: Vec<Request>,
    gas: &GasTarget,
    deadline: Instant,
) -> Vec<(Request, CycleLog)> {
    join_all(requests.into_iter().map(|request| async move {
        let mut log = CycleLog::new();
        let (request, _) = fulfiller.process(rpc, request, gas, deadline, &mut log).await;
        (request, log)
    }))
    .await
}
