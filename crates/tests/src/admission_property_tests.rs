//! Property tests for per-chain admission control.

use crate::mock_infrastructure::{RequestBuilder, CHAIN_ID};
use oracle_core::{
    admission::{apply_chain_limits, BatchesByChain},
    logging::LogLevel,
    types::ProviderBatch,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Block numbers of each provider's data requests and withdrawals.
type ProviderShape = (Vec<u64>, Vec<u64>);

fn provider_shapes() -> impl Strategy<Value = Vec<ProviderShape>> {
    prop::collection::vec(
        (prop::collection::vec(0u64..100, 0..8), prop::collection::vec(0u64..100, 0..4)),
        1..5,
    )
}

fn build_batches(shapes: &[ProviderShape]) -> Vec<ProviderBatch> {
    let mut next_id = 1u8;
    let mut fresh_id = || {
        let id = next_id;
        next_id += 1;
        id
    };

    shapes
        .iter()
        .enumerate()
        .map(|(index, (api_calls, withdrawals))| {
            let name = format!("provider-{index}");
            let mut batch = ProviderBatch::new(CHAIN_ID, name.as_str());
            for &block in api_calls {
                batch.api_calls.push(RequestBuilder::api_call(fresh_id(), &name, block).build());
            }
            for &block in withdrawals {
                batch.withdrawals.push(RequestBuilder::withdrawal(fresh_id(), &name, block).build());
            }
            batch
        })
        .collect()
}

fn admit(limit: usize, batches: Vec<ProviderBatch>) -> (Vec<ProviderBatch>, usize) {
    let limits = HashMap::from([(CHAIN_ID, limit)]);
    let (mut pruned, log) =
        apply_chain_limits(&limits, BatchesByChain::from([(CHAIN_ID, batches)]));
    let drops = log.at_level(LogLevel::Info).count();
    (pruned.remove(&CHAIN_ID).unwrap_or_default(), drops)
}

proptest! {
    #[test]
    fn prop_admitted_total_is_capped(limit in 0usize..30, shapes in provider_shapes()) {
        let batches = build_batches(&shapes);
        let total: usize = batches.iter().map(ProviderBatch::len).sum();

        let (kept, drops) = admit(limit, batches);
        let admitted: usize = kept.iter().map(ProviderBatch::len).sum();

        prop_assert_eq!(admitted, total.min(limit));
        prop_assert_eq!(drops, total - admitted);
    }

    #[test]
    fn prop_oldest_requests_are_kept(limit in 0usize..30, shapes in provider_shapes()) {
        let batches = build_batches(&shapes);
        let originals: BTreeMap<String, ProviderBatch> =
            batches.iter().map(|b| (b.provider_name.clone(), b.clone())).collect();

        let (kept, _) = admit(limit, batches);
        prop_assert_eq!(kept.len(), originals.len());

        for batch in &kept {
            let original = &originals[&batch.provider_name];
            let kept_ids: HashSet<_> = batch.requests().map(|r| r.id).collect();
            prop_assert!(kept_ids.iter().all(|id| original.requests().any(|r| r.id == *id)));

            let newest_kept = batch.requests().map(|r| r.block_number).max();
            let oldest_dropped = original
                .requests()
                .filter(|r| !kept_ids.contains(&r.id))
                .map(|r| r.block_number)
                .min();
            if let (Some(newest_kept), Some(oldest_dropped)) = (newest_kept, oldest_dropped) {
                prop_assert!(newest_kept <= oldest_dropped);
            }
        }
    }

    #[test]
    fn prop_small_providers_are_never_starved(limit in 0usize..30, shapes in provider_shapes()) {
        let batches = build_batches(&shapes);
        let fair_share = limit / batches.len();
        let sizes: HashMap<String, usize> =
            batches.iter().map(|b| (b.provider_name.clone(), b.len())).collect();

        let (kept, _) = admit(limit, batches);

        for batch in &kept {
            let size = sizes[&batch.provider_name];
            if size <= fair_share {
                prop_assert_eq!(batch.len(), size);
            }
        }
    }
}
