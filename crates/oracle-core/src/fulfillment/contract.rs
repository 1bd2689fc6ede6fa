//! Call encoding for the request-response protocol contract.

use crate::types::Request;
use alloy::{
    primitives::{keccak256, Address, Bytes, FixedBytes, B256, U256},
    sol,
    sol_types::{SolCall, SolValue},
};
use std::fmt;

sol! {
    interface IAirnodeRrp {
        function fulfill(
            bytes32 requestId,
            address airnode,
            uint256 statusCode,
            bytes data,
            address fulfillAddress,
            bytes4 fulfillFunctionId
        ) external returns (bool callSuccess, bytes callData);

        function fail(
            bytes32 requestId,
            address airnode,
            address fulfillAddress,
            bytes4 fulfillFunctionId
        ) external;

        function fulfillWithdrawal(
            bytes32 withdrawalRequestId,
            address airnode,
            address sponsor
        ) external payable;
    }
}

/// Canonical signature of the error-reporting entry point.
///
/// Encoded by hand: `error` is reserved for custom error declarations inside `sol!`.
pub const ERROR_SIGNATURE: &str = "error(bytes32,address,uint256,string,address,bytes4)";

/// Status code reported alongside a successful response.
pub const FULFILL_STATUS_OK: u64 = 0;

/// The contract entry point a transaction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Fulfill,
    Error,
    Fail,
    FulfillWithdrawal,
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fulfill => "fulfill",
            Self::Error => "error",
            Self::Fail => "fail",
            Self::FulfillWithdrawal => "fulfillWithdrawal",
        }
    }

    /// First four bytes of the call data for this entry point.
    #[must_use]
    pub fn selector(&self) -> [u8; 4] {
        match self {
            Self::Fulfill => IAirnodeRrp::fulfillCall::SELECTOR,
            Self::Fail => IAirnodeRrp::failCall::SELECTOR,
            Self::FulfillWithdrawal => IAirnodeRrp::fulfillWithdrawalCall::SELECTOR,
            Self::Error => {
                let hash = keccak256(ERROR_SIGNATURE);
                [hash[0], hash[1], hash[2], hash[3]]
            }
        }
    }

    /// Whether the entry point returns `(bool callSuccess, bytes callData)`.
    #[must_use]
    pub fn reports_call_result(&self) -> bool {
        matches!(self, Self::Fulfill | Self::Error)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded call data plus the value attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub action: Action,
    pub data: Bytes,
    pub value: U256,
}

impl ContractCall {
    /// `fulfill` with the request's response payload.
    #[must_use]
    pub fn fulfill(request: &Request, response: &Bytes) -> Self {
        let call = IAirnodeRrp::fulfillCall {
            requestId: request.id,
            airnode: request.airnode,
            statusCode: U256::from(FULFILL_STATUS_OK),
            data: response.clone(),
            fulfillAddress: request.fulfill_address,
            fulfillFunctionId: request.fulfill_function_id,
        };
        Self { action: Action::Fulfill, data: call.abi_encode().into(), value: U256::ZERO }
    }

    /// `error` reporting an off-chain failure for the request.
    #[must_use]
    pub fn error(request: &Request, error_code: u64, error_message: &str) -> Self {
        let params = (
            request.id,
            request.airnode,
            U256::from(error_code),
            error_message.to_string(),
            request.fulfill_address,
            request.fulfill_function_id,
        )
            .abi_encode_params();
        let mut data = Action::Error.selector().to_vec();
        data.extend_from_slice(&params);
        Self { action: Action::Error, data: data.into(), value: U256::ZERO }
    }

    /// Unconditional `fail`, which never calls back into the requester.
    #[must_use]
    pub fn fail(request: &Request) -> Self {
        let call = IAirnodeRrp::failCall {
            requestId: request.id,
            airnode: request.airnode,
            fulfillAddress: request.fulfill_address,
            fulfillFunctionId: request.fulfill_function_id,
        };
        Self { action: Action::Fail, data: call.abi_encode().into(), value: U256::ZERO }
    }

    /// `fulfillWithdrawal` sending `value` to the sponsor.
    #[must_use]
    pub fn fulfill_withdrawal(request: &Request, value: U256) -> Self {
        let call = IAirnodeRrp::fulfillWithdrawalCall {
            withdrawalRequestId: request.id,
            airnode: request.airnode,
            sponsor: request.sponsor,
        };
        Self { action: Action::FulfillWithdrawal, data: call.abi_encode().into(), value }
    }
}

/// Decodes the `(bool callSuccess, bytes callData)` returned by `fulfill` and `error`.
///
/// # Errors
///
/// Returns the decoder's message if the return data is malformed.
pub fn decode_call_result(data: &[u8]) -> Result<(bool, Bytes), String> {
    <(bool, Bytes)>::abi_decode_params(data).map_err(|e| e.to_string())
}

/// Splits call data into selector and parameters, for inspecting submitted transactions.
#[must_use]
pub fn split_selector(data: &[u8]) -> Option<([u8; 4], &[u8])> {
    let (selector, params) = data.split_first_chunk::<4>()?;
    Some((*selector, params))
}

/// Decodes the parameters of an `error` call.
///
/// # Errors
///
/// Returns the decoder's message if the parameters are malformed.
pub fn decode_error_params(
    params: &[u8],
) -> Result<(B256, Address, U256, String, Address, FixedBytes<4>), String> {
    <(B256, Address, U256, String, Address, FixedBytes<4>)>::abi_decode_params(params)
        .map_err(|e| e.to_string())
}
