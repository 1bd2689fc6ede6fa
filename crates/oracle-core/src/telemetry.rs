//! Prometheus counters for the processing pipeline.
//!
//! Recording goes through the `metrics` facade, so these calls are no-ops until the node binary
//! installs an exporter. Label values are chain ids, strategy names and action names; all are
//! bounded by configuration.

use metrics::counter;

/// A request was dropped by admission control.
pub fn record_admission_drop(chain_id: u64) {
    counter!("oracle_admission_dropped_total", "chain_id" => chain_id.to_string()).increment(1);
}

/// A gas price strategy finished, successfully or not.
pub fn record_gas_strategy(chain_id: u64, strategy: &'static str, success: bool) {
    counter!(
        "oracle_gas_strategy_total",
        "chain_id" => chain_id.to_string(),
        "strategy" => strategy,
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

/// A transaction was handed to the node, or the node rejected it.
pub fn record_submission(chain_id: u64, action: &'static str, success: bool) {
    counter!(
        "oracle_transactions_total",
        "chain_id" => chain_id.to_string(),
        "action" => action,
        "outcome" => if success { "sent" } else { "rejected" }
    )
    .increment(1);
}

/// A provider's cycle exceeded its time budget and its results were discarded.
pub fn record_provider_timeout(chain_id: u64, provider: &str) {
    counter!(
        "oracle_provider_timeouts_total",
        "chain_id" => chain_id.to_string(),
        "provider" => provider.to_string()
    )
    .increment(1);
}

/// A signing request was rejected at the consensus boundary.
pub fn record_signing_rejection(reason: &'static str) {
    counter!("oracle_signing_rejections_total", "reason" => reason).increment(1);
}
