//! Gas price strategy configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while interpreting gas configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GasConfigError {
    #[error("gas price oracle for chain {0} must contain a constant strategy")]
    MissingConstant(u64),
    #[error("invalid amount {value} {unit}: {reason}")]
    InvalidAmount { value: String, unit: GasUnit, reason: &'static str },
    #[error("invalid multiplier {0}: must be a finite number greater than zero")]
    InvalidMultiplier(String),
    #[error("invalid percentile {0}: must be within 1..=100")]
    InvalidPercentile(u8),
}

/// Denomination of a configured gas amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasUnit {
    Wei,
    Kwei,
    Mwei,
    Gwei,
    Szabo,
    Finney,
    Ether,
}

impl GasUnit {
    /// Number of decimal places between this unit and wei.
    #[must_use]
    pub fn decimals(self) -> u32 {
        match self {
            Self::Wei => 0,
            Self::Kwei => 3,
            Self::Mwei => 6,
            Self::Gwei => 9,
            Self::Szabo => 12,
            Self::Finney => 15,
            Self::Ether => 18,
        }
    }
}

impl fmt::Display for GasUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wei => "wei",
            Self::Kwei => "kwei",
            Self::Mwei => "mwei",
            Self::Gwei => "gwei",
            Self::Szabo => "szabo",
            Self::Finney => "finney",
            Self::Ether => "ether",
        };
        f.write_str(name)
    }
}

/// A configured amount such as `{ value = 1.5, unit = "gwei" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: f64,
    pub unit: GasUnit,
}

impl Amount {
    #[must_use]
    pub fn new(value: f64, unit: GasUnit) -> Self {
        Self { value, unit }
    }

    /// Converts the amount to wei.
    ///
    /// The value is read through its shortest decimal representation, so `1.1 gwei` is exactly
    /// `1_100_000_000` wei rather than whatever the nearest binary float scales to.
    ///
    /// # Errors
    ///
    /// Fails for negative or non-finite values, for more fractional digits than the unit allows,
    /// and for amounts that overflow `u128`.
    pub fn to_wei(&self) -> Result<u128, GasConfigError> {
        let invalid = |reason| GasConfigError::InvalidAmount {
            value: self.value.to_string(),
            unit: self.unit,
            reason,
        };

        if !self.value.is_finite() || self.value < 0.0 {
            return Err(invalid("must be a finite, non-negative number"));
        }

        let text = self.value.to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
        let decimals = self.unit.decimals() as usize;
        if fraction.len() > decimals {
            return Err(invalid("too many decimal places for unit"));
        }

        let digits = format!("{whole}{fraction:0<decimals$}");
        digits.parse::<u128>().map_err(|_| invalid("does not fit in 128 bits"))
    }
}

/// A multiplier with two decimal places of precision, stored in hundredths.
///
/// Applied with integer arithmetic so that `price × 1.1` never picks up float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Multiplier(u32);

impl Multiplier {
    /// Creates a multiplier from hundredths, e.g. `110` for `1.1`.
    #[must_use]
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub fn hundredths(self) -> u128 {
        u128::from(self.0)
    }

    /// `value × multiplier`, rounded down.
    #[must_use]
    pub fn apply(self, value: u128) -> u128 {
        value.saturating_mul(self.hundredths()) / 100
    }
}

impl TryFrom<f64> for Multiplier {
    type Error = GasConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let hundredths = (value * 100.0).round();
        if !value.is_finite() || hundredths < 1.0 || hundredths > f64::from(u32::MAX) {
            return Err(GasConfigError::InvalidMultiplier(value.to_string()));
        }
        Ok(Self(hundredths as u32))
    }
}

impl From<Multiplier> for f64 {
    fn from(multiplier: Multiplier) -> Self {
        f64::from(multiplier.0) / 100.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// One entry of a chain's ordered gas price oracle.
///
/// Configured as a tagged table:
///
/// ```toml
/// [[chains.gas_price_oracle]]
/// strategy = "provider_recommended"
/// multiplier = 1.1
///
/// [[chains.gas_price_oracle]]
/// strategy = "constant"
/// gas_price = { value = 10, unit = "gwei" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum GasStrategy {
    /// The configured price, verbatim. Cannot fail.
    Constant { gas_price: Amount },
    /// `eth_gasPrice` scaled by a multiplier.
    ProviderRecommended { multiplier: Multiplier },
    /// EIP-1559 fees from the latest block's base fee.
    ProviderRecommendedEip1559 { base_fee_multiplier: Multiplier, priority_fee: Amount },
    /// The percentile price of recent block transactions, sanity-checked against an older block.
    LatestBlockPercentile {
        percentile: u8,
        min_transaction_count: usize,
        past_to_compare_in_blocks: u64,
        max_deviation_multiplier: Multiplier,
    },
}

impl GasStrategy {
    /// Stable name used in log entries and metric labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "constant",
            Self::ProviderRecommended { .. } => "provider_recommended",
            Self::ProviderRecommendedEip1559 { .. } => "provider_recommended_eip1559",
            Self::LatestBlockPercentile { .. } => "latest_block_percentile",
        }
    }

    /// Checks the parameters that serde alone cannot.
    ///
    /// # Errors
    ///
    /// Returns the first invalid amount or percentile.
    pub fn validate(&self) -> Result<(), GasConfigError> {
        match self {
            Self::Constant { gas_price } => gas_price.to_wei().map(|_| ()),
            Self::ProviderRecommended { .. } => Ok(()),
            Self::ProviderRecommendedEip1559 { priority_fee, .. } => priority_fee.to_wei().map(|_| ()),
            Self::LatestBlockPercentile { percentile, .. } => {
                if (1..=100).contains(percentile) {
                    Ok(())
                } else {
                    Err(GasConfigError::InvalidPercentile(*percentile))
                }
            }
        }
    }
}
