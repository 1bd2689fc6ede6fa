use crate::types::{ProviderBatch, Request};

/// Gives every request that still needs a transaction a nonce, starting at `first_nonce`.
///
/// Requests are ordered by `(block_number, id)` across both data requests and withdrawals so
/// the oldest request always gets the lowest nonce. Fulfilled requests are left untouched.
/// Returns the next unused nonce.
pub fn assign_nonces(batch: &mut ProviderBatch, first_nonce: u64) -> u64 {
    let mut pending: Vec<&mut Request> = batch
        .api_calls
        .iter_mut()
        .chain(batch.withdrawals.iter_mut())
        .filter(|request| request.needs_transaction())
        .collect();
    pending.sort_by(|a, b| (a.block_number, a.id).cmp(&(b.block_number, b.id)));

    let mut next = first_nonce;
    for request in pending {
        request.nonce = Some(next);
        next += 1;
    }
    next
}
