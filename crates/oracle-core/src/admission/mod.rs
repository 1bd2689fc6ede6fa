//! Per-chain admission control.
//!
//! Several providers (RPC endpoints) can report the same chain's pending work. Before any
//! transaction is attempted, the batches for a chain are pruned so the total number of requests
//! the node works on stays within the chain's `max_concurrency`.
//!
//! # Fairness
//!
//! Providers are visited smallest-first. Each one may keep at most an equal share of the capacity
//! that is still unclaimed, so a provider reporting very little work is never starved by one
//! reporting a lot, and capacity a small provider does not use rolls over to the larger ones.
//! Within a provider the oldest requests (lowest block number) are kept.
//!
//! ```text
//! limit = 10, providers report (10, 4, 3)
//!
//!   sorted:  3   4   10
//!   share:  10/3=3  7/2=3  4/1=4
//!   kept:    3   3   4      dropped: 0 + 1 + 6 = 7
//! ```

use crate::{
    logging::CycleLog,
    telemetry,
    types::{ProviderBatch, Request, RequestKind},
};
use std::collections::{BTreeMap, HashMap};

/// Provider batches grouped by chain id.
pub type BatchesByChain = BTreeMap<u64, Vec<ProviderBatch>>;

/// Prunes every chain's provider batches to that chain's concurrency limit.
///
/// Limits are looked up by chain id. Chains without a configured limit pass through untouched
/// and a warning is logged. Every dropped request gets one INFO entry in the returned log.
///
/// This never fails and never blocks.
#[must_use]
pub fn apply_chain_limits(
    chain_limits: &HashMap<u64, usize>,
    batches_by_chain: BatchesByChain,
) -> (BatchesByChain, CycleLog) {
    let mut log = CycleLog::new();
    let mut pruned = BatchesByChain::new();

    for (chain_id, batches) in batches_by_chain {
        let Some(&limit) = chain_limits.get(&chain_id) else {
            log.warn(format!("No concurrency limit configured for chain:{chain_id}"));
            pruned.insert(chain_id, batches);
            continue;
        };
        pruned.insert(chain_id, limit_chain(chain_id, limit, batches, &mut log));
    }

    (pruned, log)
}

/// One provider's requests flattened into a single oldest-first list.
///
/// The vector holding these is indexed by the provider's original position, so reassembly never
/// depends on the sorted view.
struct FlattenedBatch {
    shell: ProviderBatch,
    requests: Vec<Request>,
}

fn limit_chain(
    chain_id: u64,
    limit: usize,
    batches: Vec<ProviderBatch>,
    log: &mut CycleLog,
) -> Vec<ProviderBatch> {
    let mut flattened: Vec<FlattenedBatch> = batches
        .into_iter()
        .map(|mut batch| {
            let mut requests = std::mem::take(&mut batch.api_calls);
            requests.append(&mut batch.withdrawals);
            // Stable sort keeps the reported order among requests from the same block.
            requests.sort_by_key(|request| request.block_number);
            FlattenedBatch { shell: batch, requests }
        })
        .collect();

    let mut order: Vec<usize> = (0..flattened.len()).collect();
    order.sort_by_key(|&index| flattened[index].requests.len());

    let provider_count = order.len();
    let mut remaining = limit;

    for (position, &index) in order.iter().enumerate() {
        let unprocessed = provider_count - position;
        let entry = &mut flattened[index];
        let allowed = (remaining / unprocessed).min(entry.requests.len());

        for dropped in entry.requests.drain(allowed..) {
            log.info(format!(
                "Ignoring request with ID:{} on chain:{} because it exceeded chain limit:{}",
                dropped.id, chain_id, limit
            ));
            telemetry::record_admission_drop(chain_id);
        }

        remaining -= allowed;
    }

    flattened
        .into_iter()
        .map(|FlattenedBatch { mut shell, requests }| {
            let (api_calls, withdrawals): (Vec<Request>, Vec<Request>) =
                requests.into_iter().partition(|request| request.kind == RequestKind::ApiCall);
            shell.api_calls = api_calls;
            shell.withdrawals = withdrawals;
            shell
        })
        .collect()
}
