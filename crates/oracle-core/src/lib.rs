//! # Oracle Core
//!
//! Core library for a multi-chain oracle node that answers on-chain data requests.
//!
//! This crate provides:
//!
//! - **[`admission`]**: fair pruning of provider batches to each chain's concurrency limit.
//!
//! - **[`gas`]**: an ordered fallback chain of gas price strategies that always yields a
//!   [`gas::GasTarget`] within its time budget.
//!
//! - **[`fulfillment`]**: the per-request simulate-then-submit cascade (fulfill, error, fail)
//!   and sponsor wallet withdrawals, with local transaction signing.
//!
//! - **[`beacon`]**: validation of independently signed beacon values and selection of the
//!   largest consistent majority.
//!
//! - **[`cycle`]**: the coordinator that runs one processing cycle across chains and providers.
//!
//! - **[`rpc`]**: JSON-RPC transport, error classification and bounded retries.
//!
//! ## Cycle Flow
//!
//! ```text
//! ProviderBatch × N
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Admission  │ ─── over limit ──► Deferred (logged)
//! └──────┬──────┘
//!        │ per provider, concurrently, under a timeout
//!        ▼
//! ┌─────────────┐
//! │ Gas Oracle  │ ─── deadline passed ──► Constant price
//! └──────┬──────┘
//!        │ GasTarget
//!        ▼
//! ┌─────────────┐
//! │   Nonces    │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Fulfillment │ ──► simulate ──► submit
//! └──────┬──────┘
//!        │
//!        ▼
//!  Updated requests + CycleLog
//! ```

pub mod admission;
pub mod beacon;
pub mod config;
pub mod cycle;
pub mod fulfillment;
pub mod gas;
pub mod logging;
pub mod rpc;
pub mod telemetry;
pub mod types;
