//! Fulfillment cascade against a provider served over HTTP.

use crate::mock_infrastructure::{
    client_for, dev_signer, fast_retry, rrp_address, RequestBuilder, RpcMockBuilder, CHAIN_ID,
};
use alloy::{
    primitives::{Bytes, B256},
    sol_types::SolValue,
};
use oracle_core::{
    fulfillment::{Action, Fulfiller, Outcome, TransactionSigner},
    gas::GasTarget,
    logging::CycleLog,
    types::RequestStatus,
};
use std::time::Duration;
use tokio::time::Instant;

const GAS: GasTarget = GasTarget::Legacy { gas_price: 10_000_000_000, gas_limit: 500_000 };

fn fulfiller() -> Fulfiller {
    Fulfiller::new(rrp_address(), TransactionSigner::new(dev_signer(), CHAIN_ID), fast_retry())
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

fn tx_hash() -> String {
    format!("0x{}", "ab".repeat(32))
}

fn call_result(success: bool) -> Vec<u8> {
    (success, Bytes::new()).abi_encode_params()
}

#[tokio::test]
async fn test_successful_simulation_submits_fulfill() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_call_result(Action::Fulfill.selector(), &call_result(true))
        .expect_send_raw_transaction(&tx_hash(), 1);

    let client = client_for("local", mock.url());
    let request = RequestBuilder::api_call(1, "local", 10).nonce(4).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    let hash: B256 = tx_hash().parse().unwrap();
    assert_eq!(outcome, Outcome::Fulfilled(hash));
    assert_eq!(request.status, RequestStatus::Fulfilled);
    assert_eq!(request.fulfilled_tx, Some(hash));
    assert!(log.entries().iter().any(|e| e.message.contains("with nonce:4")));
    mock.verify().await;
}

#[tokio::test]
async fn test_reverting_fulfill_reports_error() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_call_revert(Action::Fulfill.selector(), "Invalid request fulfillment")
        .mock_call_result(Action::Error.selector(), &call_result(true))
        .expect_send_raw_transaction(&tx_hash(), 1);

    let client = client_for("local", mock.url());
    let request = RequestBuilder::api_call(2, "local", 10).nonce(0).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    assert!(matches!(outcome, Outcome::Errored(_)));
    assert_eq!(request.error_code, Some(3));
    assert_eq!(request.error_message.as_deref(), Some("Fulfill transaction failed"));
    mock.verify().await;
}

#[tokio::test]
async fn test_missing_response_skips_fulfill_simulation() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_call_result(Action::Error.selector(), &call_result(true))
        .expect_send_raw_transaction(&tx_hash(), 1);

    let client = client_for("local", mock.url());
    let request = RequestBuilder::api_call(3, "local", 10).no_response().nonce(0).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    assert!(matches!(outcome, Outcome::Errored(_)));
    assert_eq!(request.error_code, Some(1));
    mock.verify().await;
}

#[tokio::test]
async fn test_failing_requester_and_error_report_submits_single_fail() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_call_result(Action::Fulfill.selector(), &call_result(false))
        .mock_call_revert(Action::Error.selector(), "Not sponsored")
        .expect_send_raw_transaction(&tx_hash(), 1);

    let client = client_for("local", mock.url());
    let request = RequestBuilder::api_call(4, "local", 10).nonce(9).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(request.status, RequestStatus::Fulfilled);
    mock.verify().await;
}

#[tokio::test]
async fn test_rejected_submission_leaves_request_pending() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_call_result(Action::Fulfill.selector(), &call_result(true))
        .mock_rpc_error("eth_sendRawTransaction", -32000, "nonce too low");

    let client = client_for("local", mock.url());
    let request = RequestBuilder::api_call(5, "local", 10).nonce(1).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    assert_eq!(outcome, Outcome::SubmissionFailed(Action::Fulfill));
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.fulfilled_tx, None);
    assert!(log.entries().iter().any(|e| e.message.contains("nonce too low")));
}

#[tokio::test]
async fn test_withdrawal_sends_balance_minus_cost() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_balance(1_000_000_000_000_000_000).expect_send_raw_transaction(&tx_hash(), 1);

    let client = client_for("local", mock.url());
    let request = RequestBuilder::withdrawal(6, "local", 10).nonce(2).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    assert!(matches!(outcome, Outcome::Fulfilled(_)));
    assert_eq!(request.status, RequestStatus::Fulfilled);
    mock.verify().await;
}

#[tokio::test]
async fn test_withdrawal_below_gas_cost_is_skipped() {
    let mut mock = RpcMockBuilder::new().await;
    // Exactly the maximum transaction cost: nothing would be left to send.
    mock.mock_balance(5_000_000_000_000_000).expect_send_raw_transaction(&tx_hash(), 0);

    let client = client_for("local", mock.url());
    let request = RequestBuilder::withdrawal(7, "local", 10).nonce(2).build();

    let mut log = CycleLog::new();
    let (request, outcome) =
        fulfiller().process(&client, request, &GAS, deadline(), &mut log).await;

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(request.status, RequestStatus::Pending);
    mock.verify().await;
}
