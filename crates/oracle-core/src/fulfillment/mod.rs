//! Per-request fulfillment state machine.
//!
//! Each request that still needs a transaction goes through a cascade of simulations, each one
//! a cheaper but less useful answer than the last:
//!
//! ```text
//! Pending ──simulate fulfill──ok──▶ submit fulfill
//!    │ fails / no response
//!    ▼
//! Errored ──simulate error────ok──▶ submit error
//!    │ fails
//!    ▼
//!          submit fail (unconditional)
//! ```
//!
//! Only a failed simulation moves the cascade forward. A rejected submission ends processing of
//! the request for this cycle, so at most one transaction per request is ever sent. Withdrawals
//! skip the cascade and send the sponsor wallet's balance minus the transaction cost.

pub mod contract;
pub mod nonce;
pub mod transaction;

pub use contract::{Action, ContractCall};
pub use nonce::assign_nonces;
pub use transaction::{TransactionSigner, TxError};

use crate::{
    gas::GasTarget,
    logging::CycleLog,
    rpc::{with_retries, CallRequest, ChainRpc, RetryConfig},
    telemetry,
    types::{Request, RequestKind, RequestStatus},
};
use alloy::{
    primitives::{Address, B256, U256},
    sol_types::decode_revert_reason,
};
use tokio::time::Instant;

/// Error codes reported on-chain through `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestErrorCode {
    /// The off-chain call produced no response payload.
    NoResponse,
    /// The off-chain call failed without a more specific code.
    ApiCallFailed,
    /// Simulating `fulfill` predicted a revert.
    FulfillTransactionFailed,
}

impl RequestErrorCode {
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            Self::NoResponse => 1,
            Self::ApiCallFailed => 2,
            Self::FulfillTransactionFailed => 3,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NoResponse => "No response received for request",
            Self::ApiCallFailed => "API call failed",
            Self::FulfillTransactionFailed => "Fulfill transaction failed",
        }
    }
}

/// What happened to a request in one pass through [`Fulfiller::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No transaction was needed or possible this cycle.
    Skipped,
    /// `fulfill` or `fulfillWithdrawal` was submitted.
    Fulfilled(B256),
    /// `error` was submitted.
    Errored(B256),
    /// `fail` was submitted.
    Failed(B256),
    /// The node rejected the transaction for this action.
    SubmissionFailed(Action),
}

impl Outcome {
    /// Hash of the submitted transaction, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<B256> {
        match self {
            Self::Fulfilled(hash) | Self::Errored(hash) | Self::Failed(hash) => Some(*hash),
            Self::Skipped | Self::SubmissionFailed(_) => None,
        }
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Simulated {
    Succeeded,
    Failed,
    /// The deadline passed before the provider answered. Not evidence of a revert.
    OutOfTime,
}

/// Drives requests of one chain through simulation and submission.
#[derive(Debug, Clone)]
pub struct Fulfiller {
    rrp_address: Address,
    signer: TransactionSigner,
    retry: RetryConfig,
}

impl Fulfiller {
    #[must_use]
    pub fn new(rrp_address: Address, signer: TransactionSigner, retry: RetryConfig) -> Self {
        Self { rrp_address, signer, retry }
    }

    /// Address transactions are sent from. Its pending transaction count seeds nonce assignment.
    #[must_use]
    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Processes one request, returning its updated state and what was done.
    ///
    /// A fulfilled request makes no RPC call. A request without an assigned nonce is skipped.
    /// Balance and simulation calls are bounded by `deadline`; a request that runs out of time
    /// is returned unchanged so it is picked up again next cycle.
    /// When a transaction is submitted the request's status becomes
    /// [`RequestStatus::Fulfilled`] with the hash recorded; external confirmation tracking
    /// decides when it leaves the working set.
    pub async fn process(
        &self,
        rpc: &dyn ChainRpc,
        request: Request,
        gas: &GasTarget,
        deadline: Instant,
        log: &mut CycleLog,
    ) -> (Request, Outcome) {
        if request.status == RequestStatus::Fulfilled {
            log.debug(format!("Request ID:{} is already fulfilled", request.id));
            return (request, Outcome::Skipped);
        }

        let Some(nonce) = request.nonce else {
            log.error(format!("Request ID:{} has no nonce assigned, skipping", request.id));
            return (request, Outcome::Skipped);
        };

        if Instant::now() >= deadline {
            log.warn(format!("No time left to process request ID:{}, skipping", request.id));
            return (request, Outcome::Skipped);
        }

        match request.kind {
            RequestKind::ApiCall => {
                self.process_api_call(rpc, request, gas, nonce, deadline, log).await
            }
            RequestKind::Withdrawal => {
                self.process_withdrawal(rpc, request, gas, nonce, deadline, log).await
            }
        }
    }

    async fn process_api_call(
        &self,
        rpc: &dyn ChainRpc,
        mut request: Request,
        gas: &GasTarget,
        nonce: u64,
        deadline: Instant,
        log: &mut CycleLog,
    ) -> (Request, Outcome) {
        let original = request.clone();

        if request.status == RequestStatus::Pending {
            match request.response.clone() {
                Some(response) => {
                    let call = ContractCall::fulfill(&request, &response);
                    match self.simulate(rpc, &request, &call, gas, deadline, log).await {
                        Simulated::Succeeded => {
                            return self.submit(rpc, request, &call, gas, nonce, log).await;
                        }
                        Simulated::OutOfTime => return (original, Outcome::Skipped),
                        Simulated::Failed => {}
                    }
                    let code = RequestErrorCode::FulfillTransactionFailed;
                    request.error_code = Some(code.code());
                    request.error_message = Some(code.message().to_string());
                }
                None => {
                    log.info(format!(
                        "Request ID:{} has no response, reporting an error instead",
                        request.id
                    ));
                    let code = RequestErrorCode::NoResponse;
                    request.error_code = Some(code.code());
                    request.error_message = Some(code.message().to_string());
                }
            }
        }

        let fallback = RequestErrorCode::ApiCallFailed;
        let error_code = request.error_code.unwrap_or_else(|| fallback.code());
        let error_message =
            request.error_message.clone().unwrap_or_else(|| fallback.message().to_string());

        let call = ContractCall::error(&request, error_code, &error_message);
        match self.simulate(rpc, &request, &call, gas, deadline, log).await {
            Simulated::Succeeded => return self.submit(rpc, request, &call, gas, nonce, log).await,
            Simulated::OutOfTime => return (original, Outcome::Skipped),
            Simulated::Failed => {}
        }

        log.warn(format!(
            "Error report for request ID:{} is expected to fail, submitting fail",
            request.id
        ));
        let call = ContractCall::fail(&request);
        self.submit(rpc, request, &call, gas, nonce, log).await
    }

    async fn process_withdrawal(
        &self,
        rpc: &dyn ChainRpc,
        request: Request,
        gas: &GasTarget,
        nonce: u64,
        deadline: Instant,
        log: &mut CycleLog,
    ) -> (Request, Outcome) {
        let sender = self.signer.address();
        let fetched = with_retries(&self.retry, Some(deadline), || rpc.balance(sender)).await;
        let balance = match fetched {
            Ok(balance) => balance,
            Err(e) => {
                log.warn(format!(
                    "Unable to fetch sponsor wallet balance for withdrawal request ID:{}: {e}",
                    request.id
                ));
                return (request, Outcome::Skipped);
            }
        };

        let cost = U256::from(gas.max_transaction_cost());
        let Some(value) = balance.checked_sub(cost).filter(|value| !value.is_zero()) else {
            log.warn(format!(
                "Sponsor wallet balance:{balance} does not cover gas cost:{cost} of withdrawal request ID:{}",
                request.id
            ));
            return (request, Outcome::Skipped);
        };

        let call = ContractCall::fulfill_withdrawal(&request, value);
        self.submit(rpc, request, &call, gas, nonce, log).await
    }

    /// Dry-runs `call` with `eth_call`. Never changes chain state.
    ///
    /// Success requires both that the call does not revert and, for entry points that report it,
    /// that the call into the requester succeeded.
    async fn simulate(
        &self,
        rpc: &dyn ChainRpc,
        request: &Request,
        call: &ContractCall,
        gas: &GasTarget,
        deadline: Instant,
        log: &mut CycleLog,
    ) -> Simulated {
        let action = call.action;
        let call_request = CallRequest {
            from: self.signer.address(),
            to: self.rrp_address,
            data: call.data.clone(),
            gas: Some(U256::from(gas.gas_limit())),
        };

        let simulated =
            with_retries(&self.retry, Some(deadline), || rpc.call(&call_request)).await;
        let output = match simulated {
            Ok(output) => output,
            Err(e) if e.is_execution_revert() => {
                log.warn(format!("Simulated {action} for request ID:{} reverted: {e}", request.id));
                return Simulated::Failed;
            }
            Err(e) if Instant::now() >= deadline => {
                log.warn(format!(
                    "Ran out of time simulating {action} for request ID:{}: {e}",
                    request.id
                ));
                return Simulated::OutOfTime;
            }
            Err(e) => {
                log.warn(format!("Unable to simulate {action} for request ID:{}: {e}", request.id));
                return Simulated::Failed;
            }
        };

        if !action.reports_call_result() {
            return Simulated::Succeeded;
        }

        match contract::decode_call_result(&output) {
            Ok((true, _)) => {
                log.debug(format!("Simulated {action} for request ID:{} succeeded", request.id));
                Simulated::Succeeded
            }
            Ok((false, call_data)) => {
                let reason = decode_revert_reason(&call_data)
                    .unwrap_or_else(|| "no revert reason".to_string());
                log.warn(format!(
                    "Simulated {action} for request ID:{} failed in the requester: {reason}",
                    request.id
                ));
                Simulated::Failed
            }
            Err(e) => {
                log.warn(format!(
                    "Simulated {action} for request ID:{} returned malformed data: {e}",
                    request.id
                ));
                Simulated::Failed
            }
        }
    }

    /// Signs and sends `call`. Rejection is terminal for this request in this cycle.
    async fn submit(
        &self,
        rpc: &dyn ChainRpc,
        mut request: Request,
        call: &ContractCall,
        gas: &GasTarget,
        nonce: u64,
        log: &mut CycleLog,
    ) -> (Request, Outcome) {
        let action = call.action;
        let chain_id = self.signer.chain_id();

        let sent = match self.signer.sign(self.rrp_address, call, gas, nonce) {
            Ok(raw) => rpc.send_raw_transaction(&raw).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match sent {
            Ok(hash) => {
                telemetry::record_submission(chain_id, action.as_str(), true);
                log.info(format!(
                    "Submitted {action} transaction for request ID:{} with nonce:{nonce}, hash:{hash}",
                    request.id
                ));
                request.status = RequestStatus::Fulfilled;
                request.fulfilled_tx = Some(hash);
                let outcome = match action {
                    Action::Fulfill | Action::FulfillWithdrawal => Outcome::Fulfilled(hash),
                    Action::Error => Outcome::Errored(hash),
                    Action::Fail => Outcome::Failed(hash),
                };
                (request, outcome)
            }
            Err(reason) => {
                telemetry::record_submission(chain_id, action.as_str(), false);
                log.error(format!(
                    "Failed to submit {action} transaction for request ID:{}: {reason}",
                    request.id
                ));
                (request, Outcome::SubmissionFailed(action))
            }
        }
    }
}
