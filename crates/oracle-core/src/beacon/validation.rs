use crate::beacon::{abi, Beacon, ValidBeacon};
use alloy::primitives::{keccak256, Address, Bytes, Signature, B256, I256, U256};
use thiserror::Error;
use tracing::info;

/// Why a beacon was dropped before aggregation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BeaconError {
    #[error("missing signed data")]
    MissingSignedData,
    #[error("timestamp {0:?} is not a uint32 number of seconds")]
    InvalidTimestamp(String),
    #[error("timestamp {timestamp} is older than {staleness_seconds}s")]
    Stale { timestamp: u32, staleness_seconds: u64 },
    #[error("invalid encoded parameters: {0}")]
    InvalidParameters(#[from] abi::AbiError),
    #[error("malformed hex in {0}")]
    InvalidHex(&'static str),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("signature recovers to {recovered}, not airnode {airnode}")]
    SignerMismatch { airnode: Address, recovered: Address },
    #[error("encoded value is {0} bytes, expected one 32-byte word")]
    InvalidValueLength(usize),
    #[error("value {0} does not fit in int224")]
    ValueOutOfRange(I256),
}

/// `keccak256(airnode ‖ endpointId ‖ encodedParameters)`, tightly packed.
#[must_use]
pub fn derive_template_id(airnode: Address, endpoint_id: B256, encoded_parameters: &[u8]) -> B256 {
    let mut packed = Vec::with_capacity(20 + 32 + encoded_parameters.len());
    packed.extend_from_slice(airnode.as_slice());
    packed.extend_from_slice(endpoint_id.as_slice());
    packed.extend_from_slice(encoded_parameters);
    keccak256(packed)
}

/// The hash an airnode signs: `keccak256(templateId ‖ uint256(timestamp) ‖ encodedValue)`.
///
/// The signature is an EIP-191 personal-sign over these 32 bytes.
#[must_use]
pub fn signed_message_hash(template_id: B256, timestamp: u32, encoded_value: &[u8]) -> B256 {
    let mut packed = Vec::with_capacity(32 + 32 + encoded_value.len());
    packed.extend_from_slice(template_id.as_slice());
    packed.extend_from_slice(&U256::from(timestamp).to_be_bytes::<32>());
    packed.extend_from_slice(encoded_value);
    keccak256(packed)
}

fn parse_hex(field: &'static str, raw: &str) -> Result<Bytes, BeaconError> {
    raw.parse::<Bytes>().map_err(|_| BeaconError::InvalidHex(field))
}

/// Decodes a single `int256` word and checks it fits `int224`.
///
/// # Errors
///
/// Returns [`BeaconError::InvalidValueLength`] or [`BeaconError::ValueOutOfRange`].
pub fn decode_value(encoded_value: &[u8]) -> Result<I256, BeaconError> {
    if encoded_value.len() != 32 {
        return Err(BeaconError::InvalidValueLength(encoded_value.len()));
    }
    let value = I256::from_raw(U256::from_be_slice(encoded_value));
    let bound = I256::from_raw(U256::from(1) << 223usize);
    if value >= bound || value < -bound {
        return Err(BeaconError::ValueOutOfRange(value));
    }
    Ok(value)
}

/// Runs every validity check against one beacon.
///
/// # Errors
///
/// Returns the first check that fails.
pub fn validate_beacon(
    beacon: &Beacon,
    now: u64,
    staleness_seconds: u64,
) -> Result<ValidBeacon, BeaconError> {
    let (Some(raw_timestamp), Some(raw_value), Some(raw_signature)) =
        (&beacon.timestamp, &beacon.encoded_value, &beacon.signature)
    else {
        return Err(BeaconError::MissingSignedData);
    };

    let timestamp: u32 = raw_timestamp
        .trim()
        .parse()
        .map_err(|_| BeaconError::InvalidTimestamp(raw_timestamp.clone()))?;
    if now.saturating_sub(u64::from(timestamp)) > staleness_seconds {
        return Err(BeaconError::Stale { timestamp, staleness_seconds });
    }

    let encoded_parameters = parse_hex("encodedParameters", &beacon.encoded_parameters)?;
    abi::decode_parameters(&encoded_parameters)?;

    let encoded_value = parse_hex("encodedValue", raw_value)?;
    let signature_bytes = parse_hex("signature", raw_signature)?;
    let signature = Signature::from_raw(&signature_bytes)
        .map_err(|e| BeaconError::InvalidSignature(e.to_string()))?;

    let template_id = derive_template_id(beacon.airnode, beacon.endpoint_id, &encoded_parameters);
    let message = signed_message_hash(template_id, timestamp, &encoded_value);
    let recovered = signature
        .recover_address_from_msg(message.as_slice())
        .map_err(|e| BeaconError::InvalidSignature(e.to_string()))?;
    if recovered != beacon.airnode {
        return Err(BeaconError::SignerMismatch { airnode: beacon.airnode, recovered });
    }

    let value = decode_value(&encoded_value)?;

    Ok(ValidBeacon { airnode: beacon.airnode, template_id, timestamp, value })
}

/// Keeps the beacons that pass every check, in input order. Each drop is logged.
#[must_use]
pub fn drop_invalid_beacons(
    beacons: &[Beacon],
    now: u64,
    staleness_seconds: u64,
) -> Vec<ValidBeacon> {
    beacons
        .iter()
        .filter_map(|beacon| match validate_beacon(beacon, now, staleness_seconds) {
            Ok(valid) => Some(valid),
            Err(error) => {
                info!(airnode = %beacon.airnode, reason = %error, "dropping invalid beacon");
                None
            }
        })
        .collect()
}
