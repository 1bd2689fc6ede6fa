//! Gas price oracle against providers served over HTTP.

use crate::mock_infrastructure::{
    client_for, eip1559_block, fast_retry, legacy_block, RpcMockBuilder, CHAIN_ID,
};
use oracle_core::{
    gas::{Amount, GasPriceOracle, GasStrategy, GasTarget, GasUnit, Multiplier},
    logging::{CycleLog, LogLevel},
};
use std::time::Duration;
use tokio::time::Instant;

const GWEI: u128 = 1_000_000_000;
const GAS_LIMIT: u64 = 500_000;

fn constant() -> GasStrategy {
    GasStrategy::Constant { gas_price: Amount::new(10.0, GasUnit::Gwei) }
}

fn oracle(strategies: Vec<GasStrategy>) -> GasPriceOracle {
    GasPriceOracle::new(CHAIN_ID, strategies, GAS_LIMIT, fast_retry()).unwrap()
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(10)
}

fn percentile_strategy() -> GasStrategy {
    GasStrategy::LatestBlockPercentile {
        percentile: 60,
        min_transaction_count: 3,
        past_to_compare_in_blocks: 20,
        max_deviation_multiplier: Multiplier::from_hundredths(200),
    }
}

#[tokio::test]
async fn test_provider_recommended_applies_multiplier() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_gas_price(20 * GWEI);

    let client = client_for("local", mock.url());
    let oracle = oracle(vec![
        GasStrategy::ProviderRecommended { multiplier: Multiplier::from_hundredths(110) },
        constant(),
    ]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    assert_eq!(target, GasTarget::Legacy { gas_price: 22 * GWEI, gas_limit: GAS_LIMIT });
    assert_eq!(log.len(), 1);
    assert!(log.entries()[0].message.contains("strategy:provider_recommended"));
}

#[tokio::test]
async fn test_unavailable_provider_is_retried_then_falls_back_to_constant() {
    let mut mock = RpcMockBuilder::new().await;
    // One attempt plus two retries.
    mock.expect_http_error("eth_gasPrice", 503, 3);

    let client = client_for("flaky", mock.url());
    let oracle = oracle(vec![
        GasStrategy::ProviderRecommended { multiplier: Multiplier::from_hundredths(100) },
        constant(),
    ]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    assert_eq!(target, GasTarget::Legacy { gas_price: 10 * GWEI, gas_limit: GAS_LIMIT });
    assert_eq!(log.at_level(LogLevel::Warn).count(), 1);
    assert!(log.entries()[1].message.contains("strategy:constant"));
    mock.verify().await;
}

#[tokio::test]
async fn test_eip1559_uses_latest_base_fee() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_latest_block(&eip1559_block(100, 30 * GWEI, &[(50 * GWEI, 2 * GWEI)]));

    let client = client_for("london", mock.url());
    let oracle = oracle(vec![
        GasStrategy::ProviderRecommendedEip1559 {
            base_fee_multiplier: Multiplier::from_hundredths(200),
            priority_fee: Amount::new(2.0, GasUnit::Gwei),
        },
        constant(),
    ]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    assert_eq!(
        target,
        GasTarget::Eip1559 {
            max_priority_fee_per_gas: 2 * GWEI,
            max_fee_per_gas: 62 * GWEI,
            gas_limit: GAS_LIMIT,
        }
    );
}

#[tokio::test]
async fn test_eip1559_without_base_fee_moves_to_next_strategy() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_latest_block(&legacy_block(100, &[GWEI]));
    mock.mock_gas_price(7 * GWEI);

    let client = client_for("pre-london", mock.url());
    let oracle = oracle(vec![
        GasStrategy::ProviderRecommendedEip1559 {
            base_fee_multiplier: Multiplier::from_hundredths(200),
            priority_fee: Amount::new(2.0, GasUnit::Gwei),
        },
        GasStrategy::ProviderRecommended { multiplier: Multiplier::from_hundredths(100) },
        constant(),
    ]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    assert_eq!(target, GasTarget::Legacy { gas_price: 7 * GWEI, gas_limit: GAS_LIMIT });
    assert!(log.entries()[0].message.contains("has no base fee"));
}

#[tokio::test]
async fn test_percentile_within_deviation_is_used() {
    let mut mock = RpcMockBuilder::new().await;
    let prices = [10 * GWEI, 20 * GWEI, 30 * GWEI, 40 * GWEI, 50 * GWEI];
    mock.mock_latest_block(&legacy_block(100, &prices));
    mock.mock_block_by_number(80, &legacy_block(80, &[15 * GWEI, 25 * GWEI, 35 * GWEI]));

    let client = client_for("local", mock.url());
    let oracle = oracle(vec![percentile_strategy(), constant()]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    // 60th percentile of five prices is the third smallest.
    assert_eq!(target, GasTarget::Legacy { gas_price: 30 * GWEI, gas_limit: GAS_LIMIT });
    assert!(log.entries()[0].message.contains("strategy:latest_block_percentile"));
}

#[tokio::test]
async fn test_percentile_spike_falls_back_to_constant() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_latest_block(&legacy_block(100, &[90 * GWEI, 95 * GWEI, 100 * GWEI]));
    mock.mock_block_by_number(80, &legacy_block(80, &[10 * GWEI, 11 * GWEI, 12 * GWEI]));

    let client = client_for("local", mock.url());
    let oracle = oracle(vec![percentile_strategy(), constant()]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    assert_eq!(target, GasTarget::Legacy { gas_price: 10 * GWEI, gas_limit: GAS_LIMIT });
    assert!(log.entries()[0].message.contains("deviates"));
}

#[tokio::test]
async fn test_percentile_needs_enough_transactions() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_latest_block(&legacy_block(100, &[20 * GWEI]));
    mock.mock_block_by_number(80, &legacy_block(80, &[20 * GWEI, 20 * GWEI, 20 * GWEI]));

    let client = client_for("quiet", mock.url());
    let oracle = oracle(vec![percentile_strategy(), constant()]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, deadline(), &mut log).await;

    assert_eq!(target.max_fee_per_gas(), 10 * GWEI);
    assert!(log.entries()[0].message.contains("at least 3 required"));
}

#[tokio::test]
async fn test_expired_deadline_skips_provider_calls() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_http_error("eth_gasPrice", 500, 0);

    let client = client_for("local", mock.url());
    let oracle = oracle(vec![
        GasStrategy::ProviderRecommended { multiplier: Multiplier::from_hundredths(100) },
        constant(),
    ]);

    let mut log = CycleLog::new();
    let target = oracle.resolve(&client, Instant::now(), &mut log).await;

    assert_eq!(target.max_fee_per_gas(), 10 * GWEI);
    assert!(log.entries()[0].message.contains("deadline exceeded"));
    mock.verify().await;
}
