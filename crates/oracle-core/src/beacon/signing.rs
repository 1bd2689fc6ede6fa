//! The synchronous `sign-beacon-update` boundary.

use crate::{
    beacon::{choose_maximal_consistent_set, drop_invalid_beacons, Beacon, ConsensusSettings},
    telemetry,
};
use alloy::primitives::{Address, I256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of a `POST /sign-beacon-update` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignBeaconUpdateRequest {
    /// The airnode whose signature is being requested.
    pub airnode: Address,
    #[serde(default)]
    pub beacons: Vec<Beacon>,
}

/// Successful response listing the consistent values as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignBeaconUpdateResponse {
    pub success: bool,
    #[serde(with = "json_integers")]
    pub valid_update_values: Vec<I256>,
}

impl SignBeaconUpdateResponse {
    #[must_use]
    pub fn new(values: &[I256]) -> Self {
        Self { success: true, valid_update_values: values.to_vec() }
    }
}

/// int224 values written as bare integer literals. They do not fit any native JSON number type.
mod json_integers {
    use alloy::primitives::I256;
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::value::RawValue;

    pub fn serialize<S: Serializer>(values: &[I256], serializer: S) -> Result<S::Ok, S::Error> {
        let literals = values
            .iter()
            .map(|value| RawValue::from_string(value.to_string()).map_err(S::Error::custom))
            .collect::<Result<Vec<_>, _>>()?;
        literals.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<I256>, D::Error> {
        Vec::<Box<RawValue>>::deserialize(deserializer)?
            .iter()
            .map(|literal| literal.get().parse::<I256>().map_err(D::Error::custom))
            .collect()
    }
}

/// Rejections at the signing boundary. Each maps to a fixed client-facing message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SigningError {
    #[error("Missing signed beacon data from the Airnode requested for signing")]
    MissingSignedData,
    #[error("Not enough valid signed beacon data to proceed")]
    NotEnoughValid,
    #[error("Not enough signed beacon data within the deviation threshold to proceed")]
    NotEnoughWithinDeviation,
}

impl SigningError {
    /// HTTP status code for the response. All rejections are client errors.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        400
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::MissingSignedData => "missing_signed_data",
            Self::NotEnoughValid => "not_enough_valid",
            Self::NotEnoughWithinDeviation => "not_enough_within_deviation",
        }
    }

    #[must_use]
    pub fn to_response(&self) -> SigningErrorResponse {
        SigningErrorResponse {
            status_code: self.status_code(),
            error: ErrorMessage { message: self.to_string() },
        }
    }
}

/// Error body: `{"statusCode": 400, "error": {"message": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningErrorResponse {
    pub status_code: u16,
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Validates and aggregates a signing request.
///
/// 1. The requested airnode must have supplied a beacon with signed data.
/// 2. At least `floor(n/2) + 1` of the `n` submitted beacons must pass validation.
/// 3. The valid values must contain a consistent majority.
///
/// # Errors
///
/// Returns the [`SigningError`] for the first step that fails.
pub fn select_update_values(
    request: &SignBeaconUpdateRequest,
    now: u64,
    settings: &ConsensusSettings,
) -> Result<Vec<I256>, SigningError> {
    let result = select(request, now, settings);
    if let Err(error) = &result {
        telemetry::record_signing_rejection(error.reason());
        tracing::info!(airnode = %request.airnode, reason = %error, "rejected beacon update");
    }
    result
}

fn select(
    request: &SignBeaconUpdateRequest,
    now: u64,
    settings: &ConsensusSettings,
) -> Result<Vec<I256>, SigningError> {
    let own_data_present = request
        .beacons
        .iter()
        .any(|beacon| beacon.airnode == request.airnode && beacon.has_signed_data());
    if !own_data_present {
        return Err(SigningError::MissingSignedData);
    }

    let valid = drop_invalid_beacons(&request.beacons, now, settings.staleness_seconds);
    if valid.len() < request.beacons.len() / 2 + 1 {
        return Err(SigningError::NotEnoughValid);
    }

    let values: Vec<I256> = valid.iter().map(|beacon| beacon.value).collect();
    let consistent = choose_maximal_consistent_set(&values, settings.deviation_threshold_ppm);
    if consistent.is_empty() {
        return Err(SigningError::NotEnoughWithinDeviation);
    }

    Ok(consistent)
}
