//! Signed beacon data: validation and consensus.
//!
//! A beacon is one airnode's signed observation of a data feed. Before co-signing an update, the
//! node drops every beacon that fails validation and then looks for a majority of the remaining
//! values that agree within a deviation threshold.
//!
//! - [`validation`]: per-beacon checks (freshness, parameter encoding, signature, value range)
//! - [`quorum`]: the maximal consistent majority selector
//! - [`signing`]: the `sign-beacon-update` request and response types

pub mod abi;
pub mod quorum;
pub mod signing;
pub mod validation;

pub use quorum::{choose_maximal_consistent_set, percent_to_ppm, within_deviation};
pub use signing::{
    select_update_values, SignBeaconUpdateRequest, SignBeaconUpdateResponse, SigningError,
    SigningErrorResponse,
};
pub use validation::{
    decode_value, derive_template_id, drop_invalid_beacons, signed_message_hash, validate_beacon,
    BeaconError,
};

use alloy::primitives::{Address, B256, I256};
use serde::{Deserialize, Serialize};

/// Default maximum age of a beacon timestamp, in seconds.
pub const DEFAULT_STALENESS_SECONDS: u64 = 120;

/// Default deviation threshold, in percent.
pub const DEFAULT_DEVIATION_THRESHOLD_PERCENT: f64 = 2.5;

/// Beacon data as submitted by a client.
///
/// The signed fields are optional and kept as raw strings so a malformed beacon drops on its
/// own instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beacon {
    pub airnode: Address,
    pub endpoint_id: B256,
    #[serde(default)]
    pub encoded_parameters: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Beacon {
    /// Returns `true` if all three signed fields are present.
    #[must_use]
    pub fn has_signed_data(&self) -> bool {
        self.timestamp.is_some() && self.encoded_value.is_some() && self.signature.is_some()
    }
}

/// A beacon that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidBeacon {
    pub airnode: Address,
    pub template_id: B256,
    pub timestamp: u32,
    pub value: I256,
}

/// Thresholds applied when aggregating signed beacons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusSettings {
    pub staleness_seconds: u64,
    pub deviation_threshold_ppm: u64,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            staleness_seconds: DEFAULT_STALENESS_SECONDS,
            deviation_threshold_ppm: percent_to_ppm(DEFAULT_DEVIATION_THRESHOLD_PERCENT),
        }
    }
}
