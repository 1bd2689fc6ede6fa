//! Pure helpers behind the latest-block-percentile strategy.

use crate::gas::Multiplier;

/// Returns `true` if `reference` lies strictly between `value / multiplier` and
/// `value × multiplier`.
///
/// Evaluated as `reference × m > value` and `reference < value × m` with the multiplier in
/// hundredths, so no division or float is involved.
#[must_use]
pub fn within_limit(value: u128, reference: u128, multiplier: Multiplier) -> bool {
    let m = multiplier.hundredths();
    reference.saturating_mul(m) > value.saturating_mul(100) &&
        reference.saturating_mul(100) < value.saturating_mul(m)
}

/// Returns the `percentile`-th smallest price, or `None` for an empty list.
///
/// The index is `ceil(len × percentile / 100) - 1`, clamped to the list.
#[must_use]
pub fn percentile_price(mut prices: Vec<u128>, percentile: u8) -> Option<u128> {
    if prices.is_empty() {
        return None;
    }
    prices.sort_unstable();
    let len = prices.len();
    let rank = (len * usize::from(percentile)).div_ceil(100);
    let index = rank.saturating_sub(1).min(len - 1);
    Some(prices[index])
}
