//! Whole cycles built from configuration, against providers served over HTTP.

use crate::mock_infrastructure::{
    dev_signer, rrp_address, RequestBuilder, RpcMockBuilder, CHAIN_ID,
};
use alloy::{primitives::Bytes, sol_types::SolValue};
use oracle_core::{
    config::AppConfig,
    cycle::CycleRunner,
    fulfillment::Action,
    rpc::HttpClient,
    types::{ProviderBatch, RequestStatus},
};
use std::sync::Arc;

const GWEI: u128 = 1_000_000_000;

fn config(max_concurrency: usize, providers: &[(&str, String)]) -> AppConfig {
    let mut raw = format!(
        r#"
[node]
provider_timeout_seconds = 10
gas_oracle_timeout_seconds = 5

[[chains]]
id = {CHAIN_ID}
rrp_address = "{}"
max_concurrency = {max_concurrency}

[chains.retry]
retries = 1
min_delay_ms = 1
max_delay_ms = 5

[[chains.gas_price_oracle]]
strategy = "provider_recommended"
multiplier = 1.0

[[chains.gas_price_oracle]]
strategy = "constant"
gas_price = {{ value = 10, unit = "gwei" }}
"#,
        rrp_address()
    );
    for (name, url) in providers {
        raw.push_str(&format!("\n[[chains.providers]]\nname = \"{name}\"\nurl = \"{url}\"\n"));
    }

    let config: AppConfig = toml::from_str(&raw).unwrap();
    config.validate().unwrap();
    config
}

fn runner(config: &AppConfig) -> CycleRunner {
    let http = Arc::new(HttpClient::new().unwrap());
    CycleRunner::from_config(config, &dev_signer(), http).unwrap()
}

async fn healthy_provider(first_nonce: u64, submissions: usize) -> RpcMockBuilder {
    let success = (true, Bytes::new()).abi_encode_params();
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_gas_price(20 * GWEI)
        .mock_transaction_count(first_nonce)
        .mock_call_result(Action::Fulfill.selector(), &success)
        .expect_send_raw_transaction(&format!("0x{}", "cd".repeat(32)), submissions);
    mock
}

#[tokio::test]
async fn test_cycle_admits_fairly_and_fulfills_over_http() {
    // Both providers report the same pending count for the shared signer.
    let alpha = healthy_provider(5, 2).await;
    let beta = healthy_provider(5, 1).await;
    let config = config(3, &[("alpha", alpha.url()), ("beta", beta.url())]);

    let mut alpha_batch = ProviderBatch::new(CHAIN_ID, "alpha");
    alpha_batch.api_calls =
        (1..=3).map(|id| RequestBuilder::api_call(id, "alpha", u64::from(id)).build()).collect();
    let mut beta_batch = ProviderBatch::new(CHAIN_ID, "beta");
    beta_batch.api_calls =
        (11..=12).map(|id| RequestBuilder::api_call(id, "beta", u64::from(id)).build()).collect();

    let report = runner(&config).run_cycle(vec![alpha_batch, beta_batch]).await;

    // Smallest provider first: beta keeps 3/2 = 1, alpha keeps the remaining 2.
    assert_eq!(report.deferred.len(), 2);
    assert_eq!(report.batches.len(), 2);

    let alpha = report.batches.iter().find(|b| b.provider_name == "alpha").unwrap();
    assert_eq!(alpha.api_calls.len(), 2);
    assert!(alpha.api_calls.iter().all(|r| r.status == RequestStatus::Fulfilled));
    let beta = report.batches.iter().find(|b| b.provider_name == "beta").unwrap();
    assert_eq!(beta.api_calls.len(), 1);

    let mut nonces: Vec<u64> = report
        .batches
        .iter()
        .flat_map(|b| b.api_calls.iter().filter_map(|r| r.nonce))
        .collect();
    nonces.sort_unstable();
    assert_eq!(nonces, [5, 6, 7]);

    assert!(report
        .log
        .entries()
        .iter()
        .any(|e| e.message.contains("strategy:provider_recommended")));
}

#[tokio::test]
async fn test_unreachable_nonce_source_leaves_batch_untouched() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_gas_price(20 * GWEI)
        .expect_http_error("eth_getTransactionCount", 503, 2)
        .expect_send_raw_transaction("0x00", 0);
    let config = config(10, &[("down", mock.url())]);

    let mut batch = ProviderBatch::new(CHAIN_ID, "down");
    batch.api_calls.push(RequestBuilder::api_call(1, "down", 1).build());
    let submitted = batch.clone();

    let report = runner(&config).run_cycle(vec![batch]).await;

    assert_eq!(report.batches, vec![submitted]);
    assert!(report
        .log
        .entries()
        .iter()
        .any(|e| e.message.contains("Unable to fetch transaction count")));
    mock.verify().await;
}

#[tokio::test]
async fn test_fulfilled_batch_makes_no_provider_calls() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_http_error("eth_gasPrice", 500, 0)
        .expect_http_error("eth_getTransactionCount", 500, 0);
    let config = config(10, &[("idle", mock.url())]);

    let mut batch = ProviderBatch::new(CHAIN_ID, "idle");
    batch
        .api_calls
        .push(RequestBuilder::api_call(1, "idle", 1).status(RequestStatus::Fulfilled).build());

    let report = runner(&config).run_cycle(vec![batch]).await;

    assert_eq!(report.batches[0].api_calls[0].status, RequestStatus::Fulfilled);
    mock.verify().await;
}
