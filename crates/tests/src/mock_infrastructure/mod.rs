//! Mock Infrastructure for Testing the Oracle Node
//!
//! Reusable fixtures for exercising provider interactions over real HTTP without a chain.
//!
//! ## Components
//!
//! - `RpcMockBuilder`: Wraps mockito to answer the JSON-RPC methods the node uses
//! - Test helpers for blocks, requests and clients
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{client_for, legacy_block, RpcMockBuilder};
//!
//! let mut mock = RpcMockBuilder::new().await;
//! mock.mock_gas_price(20_000_000_000);
//!
//! let client = client_for("local", mock.url());
//! ```

pub mod rpc_mock;
pub mod test_helpers;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
