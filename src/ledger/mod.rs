pub mod config;
pub mod error;

use std::collections::HashSet;

use ethers_core::types::{Address, U256};

use crate::gateway::TokenGateway;
use crate::signature;
use crate::storage::{Storage, Transaction};
use crate::types::{Input, Output, Utxo};

pub use self::config::{Config, MAX_DEPOSIT_OUTPUTS};
pub use self::error::{DepositError, ErrorKind, GetUtxoError, TransferError, WithdrawError};

type StorageError<S> = <S as Storage>::InternalError;
type GatewayError<G> = <G as TokenGateway>::Error;

/// UTXO ledger over a token gateway.
///
/// Each state changing operation runs inside a single storage transaction, so
/// it is applied entirely or not at all, and operations never interleave.
pub struct Ledger<S, G>
where
    S: Storage,
    G: TokenGateway,
{
    storage: S,
    gateway: G,
    config: Config,
}

impl<S, G> Ledger<S, G>
where
    S: Storage,
    G: TokenGateway,
{
    pub fn new(storage: S, gateway: G, config: Config) -> Self {
        Self {
            storage,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Pull tokens from `depositor` into custody and create a UTXO for each output.
    ///
    /// If any pull fails, already pulled tokens are sent back to the depositor
    /// and no UTXO is created. Returns ids of the created UTXOs.
    pub async fn deposit(
        &self,
        depositor: &Address,
        token: Address,
        outputs: &[Output],
    ) -> Result<Vec<U256>, DepositError<StorageError<S>, GatewayError<G>>> {
        if outputs.is_empty() {
            return Err(DepositError::EmptyOutputs);
        }
        if outputs.len() > self.config.max_deposit_outputs {
            return Err(DepositError::TooManyOutputs {
                max: self.config.max_deposit_outputs,
                got: outputs.len(),
            });
        }
        if let Some(position) = outputs.iter().position(|o| o.amount.is_zero()) {
            return Err(DepositError::ZeroAmount(position));
        }

        let mut tx = self
            .storage
            .transaction()
            .await
            .map_err(DepositError::Storage)?;

        let custody = self.gateway.custody();
        let mut pulled = U256::zero();
        let mut ids = Vec::with_capacity(outputs.len());

        for output in outputs {
            if let Err(err) = self
                .gateway
                .transfer_from(&token, depositor, &custody, &output.amount)
                .await
            {
                drop(tx);
                return Err(self
                    .refund(&token, depositor, pulled, DepositError::Gateway(err))
                    .await);
            }
            pulled = pulled.saturating_add(output.amount);

            match tx.append(token, output.amount, output.owner).await {
                Ok(id) => ids.push(id),
                Err(err) => {
                    drop(tx);
                    return Err(self
                        .refund(&token, depositor, pulled, DepositError::Storage(err))
                        .await);
                }
            }
        }

        if let Err(err) = tx.commit().await {
            return Err(self
                .refund(&token, depositor, pulled, DepositError::Storage(err))
                .await);
        }

        log::info!(
            "deposited {} of {:?} from {:?} into utxos {:?}",
            pulled,
            token,
            depositor,
            ids
        );

        Ok(ids)
    }

    /// Send tokens pulled by a failed deposit back to the depositor.
    async fn refund(
        &self,
        token: &Address,
        depositor: &Address,
        pulled: U256,
        cause: DepositError<StorageError<S>, GatewayError<G>>,
    ) -> DepositError<StorageError<S>, GatewayError<G>> {
        if pulled.is_zero() {
            log::debug!("deposit rejected: {}", cause);
            return cause;
        }

        log::warn!(
            "deposit failed: {}, refunding {} of {:?} to {:?}",
            cause,
            pulled,
            token,
            depositor
        );

        match self.gateway.transfer(token, depositor, &pulled).await {
            Ok(()) => cause,
            Err(refund) => {
                log::error!(
                    "failed to refund {} of {:?} to {:?}: {}",
                    pulled,
                    token,
                    depositor,
                    refund
                );
                DepositError::Refund { pulled, refund }
            }
        }
    }

    /// Spend the UTXO of `input` and send its value to `recipient`.
    ///
    /// The recipient doesn't have to be the owner, the owner's signature over
    /// `(id, recipient)` is the only authorization.
    pub async fn withdraw(
        &self,
        input: &Input,
        recipient: &Address,
    ) -> Result<(), WithdrawError<StorageError<S>, GatewayError<G>>> {
        let mut tx = self
            .storage
            .transaction()
            .await
            .map_err(WithdrawError::Storage)?;

        let utxo = tx.get(&input.id).await?;
        if utxo.is_spent {
            return Err(WithdrawError::AlreadySpent(utxo.id));
        }

        let message = signature::withdraw_message(&utxo.id, recipient);
        signature::verify(&message, &input.signature, &utxo.owner).map_err(|source| {
            WithdrawError::InvalidSignature {
                id: utxo.id,
                source,
            }
        })?;

        // A failed payout drops `tx`, which unsets the flag again.
        tx.mark_spent(&utxo.id).await?;

        self.gateway
            .transfer(&utxo.token, recipient, &utxo.amount)
            .await
            .map_err(WithdrawError::Gateway)?;

        if let Err(err) = tx.commit().await {
            log::error!(
                "utxo {} paid out to {:?} but the spend was not committed: {}",
                utxo.id,
                recipient,
                err
            );
            return Err(WithdrawError::Storage(err));
        }

        log::info!(
            "withdrawn utxo {} of {} {:?} to {:?}",
            utxo.id,
            utxo.amount,
            utxo.token,
            recipient
        );

        Ok(())
    }

    /// Spend all `inputs` and create a UTXO for each of `outputs`.
    ///
    /// Each input must be signed by its owner over the input id and the whole
    /// list of outputs. Returns ids of the created UTXOs.
    pub async fn transfer(
        &self,
        inputs: &[Input],
        outputs: &[Output],
    ) -> Result<Vec<U256>, TransferError<StorageError<S>>> {
        if inputs.is_empty() {
            return Err(TransferError::EmptyInputs);
        }
        if outputs.is_empty() {
            return Err(TransferError::EmptyOutputs);
        }
        if let Some(position) = outputs.iter().position(|o| o.amount.is_zero()) {
            return Err(TransferError::ZeroAmount(position));
        }

        let mut tx = self
            .storage
            .transaction()
            .await
            .map_err(TransferError::Storage)?;

        let mut seen = HashSet::with_capacity(inputs.len());
        let mut utxos = Vec::with_capacity(inputs.len());

        for input in inputs {
            let utxo = tx.get(&input.id).await?;
            // the same id twice would be spent by its first occurrence
            if utxo.is_spent || !seen.insert(utxo.id) {
                return Err(TransferError::AlreadySpent(utxo.id));
            }
            utxos.push(utxo);
        }

        let token = utxos[0].token;
        if let Some(utxo) = utxos.iter().find(|utxo| utxo.token != token) {
            return Err(TransferError::TokenMismatch {
                id: utxo.id,
                expected: token,
                found: utxo.token,
            });
        }

        let inputs_amount =
            checked_sum(utxos.iter().map(|u| u.amount)).ok_or(TransferError::AmountOverflow)?;
        let outputs_amount =
            checked_sum(outputs.iter().map(|o| o.amount)).ok_or(TransferError::AmountOverflow)?;
        if inputs_amount != outputs_amount {
            return Err(TransferError::AmountMismatch {
                inputs: inputs_amount,
                outputs: outputs_amount,
            });
        }

        for (input, utxo) in inputs.iter().zip(&utxos) {
            let message = signature::transfer_message(&utxo.id, outputs);

            signature::verify(&message, &input.signature, &utxo.owner).map_err(|source| {
                TransferError::InvalidSignature {
                    id: utxo.id,
                    source,
                }
            })?;
        }

        for utxo in &utxos {
            tx.mark_spent(&utxo.id).await?;
        }

        let mut ids = Vec::with_capacity(outputs.len());
        for output in outputs {
            let id = tx
                .append(token, output.amount, output.owner)
                .await
                .map_err(TransferError::Storage)?;
            ids.push(id);
        }

        tx.commit().await.map_err(TransferError::Storage)?;

        log::info!(
            "transferred {} of {:?} from utxos {:?} to utxos {:?}",
            inputs_amount,
            token,
            utxos.iter().map(|u| u.id).collect::<Vec<_>>(),
            ids
        );

        Ok(ids)
    }
}

impl<S, G> Ledger<S, G>
where
    S: Storage,
    G: TokenGateway,
{
    pub async fn get_utxo_by_id(&self, id: &U256) -> Result<Utxo, GetUtxoError<StorageError<S>>> {
        Ok(self.storage.get(id).await?)
    }

    pub async fn get_utxo_by_ids(
        &self,
        ids: &[U256],
    ) -> Result<Vec<Utxo>, GetUtxoError<StorageError<S>>> {
        Ok(self.storage.get_many(ids).await?)
    }

    /// UTXOs with ids in `[offset, offset + limit)`. Out of range parts are
    /// clipped, so an offset past the end gives an empty list.
    pub async fn list_utxos(
        &self,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, StorageError<S>> {
        self.storage.list(offset, limit).await
    }

    /// Page over all UTXOs ever owned by `owner`, spent ones included.
    pub async fn list_utxos_by_address(
        &self,
        owner: &Address,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, StorageError<S>> {
        self.storage.list_by_owner(owner, offset, limit).await
    }

    pub async fn get_utxos_length(&self) -> Result<U256, StorageError<S>> {
        self.storage.len().await
    }
}

fn checked_sum(amounts: impl IntoIterator<Item = U256>) -> Option<U256> {
    amounts
        .into_iter()
        .try_fold(U256::zero(), |sum, amount| sum.checked_add(amount))
}
