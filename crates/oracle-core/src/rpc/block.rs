//! Block references and the subset of block data the gas strategies read.
//!
//! Quantities arrive from providers as `0x`-prefixed hex strings. They are parsed here once so
//! callers work with plain integers.

use serde::{de, Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

/// Error types for hex quantity parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex quantity: {0}")]
    InvalidHex(String),
}

/// Block reference passed as the block parameter of a JSON-RPC call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    /// Specific block number
    Number(u64),
    /// Block tag (latest, pending)
    Tag(BlockTag),
}

/// Block tags used by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// The most recent block in the canonical chain
    Latest,
    /// A block in the pending state
    Pending,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "0x{number:x}"),
            Self::Tag(BlockTag::Latest) => f.write_str("latest"),
            Self::Tag(BlockTag::Pending) => f.write_str("pending"),
        }
    }
}

impl From<u64> for BlockRef {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

/// Parses a `0x`-prefixed hex quantity.
///
/// # Errors
///
/// Returns [`ParseError::InvalidHex`] if the prefix is missing, the digits are empty or not
/// hex, or the value does not fit `u128`.
pub fn parse_quantity(value: &str) -> Result<u128, ParseError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| ParseError::InvalidHex(value.to_string()))?;
    if digits.is_empty() {
        return Err(ParseError::InvalidHex(value.to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidHex(value.to_string()))
}

/// Like [`parse_quantity`], narrowed to `u64`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidHex`] if the value is malformed or exceeds `u64`.
pub fn parse_quantity_u64(value: &str) -> Result<u64, ParseError> {
    let wide = parse_quantity(value)?;
    u64::try_from(wide).map_err(|_| ParseError::InvalidHex(value.to_string()))
}

mod quantity {
    use super::*;

    pub(super) fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_quantity_u64(&raw).map_err(de::Error::custom)
    }

    pub(super) fn opt_price<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse_quantity(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

/// A block as returned by `eth_getBlockByNumber(_, true)`.
///
/// Only the fields gas resolution needs are decoded; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(deserialize_with = "quantity::number")]
    pub number: u64,
    #[serde(default, deserialize_with = "quantity::opt_price")]
    pub base_fee_per_gas: Option<u128>,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

/// Pricing fields of a transaction embedded in a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTransaction {
    #[serde(default, deserialize_with = "quantity::opt_price")]
    pub gas_price: Option<u128>,
    #[serde(default, deserialize_with = "quantity::opt_price")]
    pub max_fee_per_gas: Option<u128>,
    #[serde(default, deserialize_with = "quantity::opt_price")]
    pub max_priority_fee_per_gas: Option<u128>,
}

impl BlockTransaction {
    /// Price per gas this transaction actually paid in a block with the given base fee.
    ///
    /// EIP-1559 transactions pay `min(maxFee, baseFee + maxPriorityFee)`. Legacy and access-list
    /// transactions pay `gasPrice`. Returns `None` when the transaction carries no usable price.
    #[must_use]
    pub fn effective_price(&self, base_fee: Option<u128>) -> Option<u128> {
        match (self.max_fee_per_gas, self.max_priority_fee_per_gas, base_fee) {
            (Some(max_fee), Some(priority), Some(base)) => {
                Some(max_fee.min(base.saturating_add(priority)))
            }
            _ => self.gas_price,
        }
    }
}
