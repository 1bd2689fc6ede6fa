use alloy::primitives::{I256, U256};

const PPM: u64 = 1_000_000;

/// Converts a percentage such as `2.5` to parts per million.
#[must_use]
pub fn percent_to_ppm(percent: f64) -> u64 {
    (percent * 10_000.0).round().max(0.0) as u64
}

/// Returns `true` if `(max - min) / |min|` is at most `threshold_ppm` parts per million.
///
/// A zero `min` is only consistent with a zero `max`.
#[must_use]
pub fn within_deviation(min: I256, max: I256, threshold_ppm: u64) -> bool {
    let spread = (max - min).unsigned_abs();
    let base = min.unsigned_abs();
    spread.saturating_mul(U256::from(PPM)) <= base.saturating_mul(U256::from(threshold_ppm))
}

/// Picks the largest run of mutually consistent values that still forms a majority.
///
/// Values are sorted and, for window sizes from `n` down to `floor(n/2) + 1`, contiguous windows
/// are scanned left to right. The first window within the deviation threshold is returned
/// sorted ascending. Returns an empty vector when no majority agrees.
#[must_use]
pub fn choose_maximal_consistent_set(values: &[I256], threshold_ppm: u64) -> Vec<I256> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    if n == 0 {
        return Vec::new();
    }
    let min_quorum = n / 2 + 1;

    for width in (min_quorum..=n).rev() {
        if let Some(window) = sorted
            .windows(width)
            .find(|window| within_deviation(window[0], window[width - 1], threshold_ppm))
        {
            return window.to_vec();
        }
    }

    Vec::new()
}
