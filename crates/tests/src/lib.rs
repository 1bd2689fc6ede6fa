//! Integration Tests for the Oracle Node
//!
//! These tests drive `oracle-core` through its public API against mock providers served over
//! real HTTP, so JSON-RPC encoding, error classification and retries are exercised end to end.
//!
//! - `gas_strategy_tests`: Gas price oracle strategies and their fallbacks
//! - `fulfillment_tests`: The fulfill, error and fail cascade plus withdrawals
//! - `cycle_tests`: Whole cycles built from TOML configuration
//! - `admission_property_tests`: Property tests for per-chain admission control
//! - `mock_infrastructure`: Reusable mock providers and fixtures
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```

#[cfg(test)]
mod gas_strategy_tests;

#[cfg(test)]
mod fulfillment_tests;

#[cfg(test)]
mod cycle_tests;

#[cfg(test)]
mod admission_property_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
