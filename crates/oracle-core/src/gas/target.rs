use serde::{Deserialize, Serialize};
use std::fmt;

/// Gas options attached to every transaction a provider submits in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GasTarget {
    #[serde(rename_all = "camelCase")]
    Legacy { gas_price: u128, gas_limit: u64 },
    #[serde(rename_all = "camelCase")]
    Eip1559 { max_priority_fee_per_gas: u128, max_fee_per_gas: u128, gas_limit: u64 },
}

impl GasTarget {
    #[must_use]
    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy { gas_limit, .. } | Self::Eip1559 { gas_limit, .. } => *gas_limit,
        }
    }

    /// The most a transaction can pay per unit of gas under this target.
    #[must_use]
    pub fn max_fee_per_gas(&self) -> u128 {
        match self {
            Self::Legacy { gas_price, .. } => *gas_price,
            Self::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// Upper bound of the fee for one transaction: `gas_limit × max_fee_per_gas`.
    #[must_use]
    pub fn max_transaction_cost(&self) -> u128 {
        u128::from(self.gas_limit()).saturating_mul(self.max_fee_per_gas())
    }
}

impl fmt::Display for GasTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy { gas_price, gas_limit } => {
                write!(f, "gasPrice:{gas_price} wei, gasLimit:{gas_limit}")
            }
            Self::Eip1559 { max_priority_fee_per_gas, max_fee_per_gas, gas_limit } => write!(
                f,
                "maxPriorityFeePerGas:{max_priority_fee_per_gas} wei, maxFeePerGas:{max_fee_per_gas} wei, gasLimit:{gas_limit}"
            ),
        }
    }
}
