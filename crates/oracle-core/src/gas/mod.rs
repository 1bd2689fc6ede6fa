//! Gas price resolution.
//!
//! Each chain configures an ordered list of [`GasStrategy`] entries. [`GasPriceOracle`] walks
//! the list under a wall-clock deadline and always ends with a [`GasTarget`].

pub mod oracle;
pub mod percentile;
pub mod strategy;
pub mod target;

pub use oracle::GasPriceOracle;
pub use percentile::{percentile_price, within_limit};
pub use strategy::{Amount, GasConfigError, GasStrategy, GasUnit, Multiplier};
pub use target::GasTarget;
