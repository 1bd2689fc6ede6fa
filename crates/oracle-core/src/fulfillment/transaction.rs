//! Building and signing raw transactions.

use crate::{fulfillment::contract::ContractCall, gas::GasTarget};
use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    primitives::{Address, Bytes, TxKind},
    signers::local::PrivateKeySigner,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("failed to sign transaction: {0}")]
    Signing(#[from] alloy::signers::Error),
}

/// Signs contract calls for one chain with the node's key.
#[derive(Debug, Clone)]
pub struct TransactionSigner {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl TransactionSigner {
    #[must_use]
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self { signer, chain_id }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Produces the EIP-2718 encoding of a signed transaction calling `to`.
    ///
    /// The transaction type follows the gas target: legacy (EIP-155 replay protected) or
    /// EIP-1559.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Signing`] if the signer rejects the transaction.
    pub fn sign(
        &self,
        to: Address,
        call: &ContractCall,
        gas: &GasTarget,
        nonce: u64,
    ) -> Result<Bytes, TxError> {
        let envelope: TxEnvelope = match *gas {
            GasTarget::Legacy { gas_price, gas_limit } => {
                let mut tx = TxLegacy {
                    chain_id: Some(self.chain_id),
                    nonce,
                    gas_price,
                    gas_limit,
                    to: TxKind::Call(to),
                    value: call.value,
                    input: call.data.clone(),
                };
                let signature = self.signer.sign_transaction_sync(&mut tx)?;
                tx.into_signed(signature).into()
            }
            GasTarget::Eip1559 { max_priority_fee_per_gas, max_fee_per_gas, gas_limit } => {
                let mut tx = TxEip1559 {
                    chain_id: self.chain_id,
                    nonce,
                    gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to: TxKind::Call(to),
                    value: call.value,
                    access_list: Default::default(),
                    input: call.data.clone(),
                };
                let signature = self.signer.sign_transaction_sync(&mut tx)?;
                tx.into_signed(signature).into()
            }
        };

        Ok(envelope.encoded_2718().into())
    }
}
