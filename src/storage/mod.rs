pub mod in_memory;

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use ethers_core::types::{Address, U256};

use crate::types::Utxo;

/// Append-only storage of UTXOs with a secondary index by owner.
///
/// Reads observe only committed state. All writes go through a [`Transaction`]
/// and writers are serialized by the storage.
#[async_trait]
pub trait Storage: Sync + Send {
    type InternalError: std::error::Error + Send + Sync + 'static;
    type Transaction: Transaction<Error = Self::InternalError>;

    /// Begin exclusive write access to the storage.
    async fn transaction(
        &self,
    ) -> Result<TransactionGuard<Self::Transaction>, Self::InternalError>;

    /// Number of UTXOs ever created. Ids are `0..len`.
    async fn len(&self) -> Result<U256, Self::InternalError>;

    async fn get(&self, id: &U256) -> Result<Utxo, GetError<Self::InternalError>>;

    /// Get UTXOs in the order of `ids`, failing on the first missing one.
    async fn get_many(&self, ids: &[U256]) -> Result<Vec<Utxo>, GetError<Self::InternalError>>;

    /// UTXOs with ids in `[offset, offset + limit)`, clipped to the storage length.
    async fn list(&self, offset: &U256, limit: &U256)
        -> Result<Vec<Utxo>, Self::InternalError>;

    /// Same as [`Storage::list`], but over the UTXOs of `owner` in creation order.
    async fn list_by_owner(
        &self,
        owner: &Address,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, Self::InternalError>;
}

/// Transaction - represents storage transaction logic.
#[async_trait]
pub trait Transaction: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, id: &U256) -> Result<Utxo, GetError<Self::Error>>;

    /// Create a new unspent UTXO and return its id.
    async fn append(
        &mut self,
        token: Address,
        amount: U256,
        owner: Address,
    ) -> Result<U256, Self::Error>;

    /// Set the spent flag. The caller is responsible for checking it was unset.
    async fn mark_spent(&mut self, id: &U256) -> Result<(), UpdateError<Self::Error>>;

    async fn commit(&mut self) -> Result<(), Self::Error>;

    /// Undo every change made since the transaction began.
    ///
    /// Called by [`TransactionGuard`] on drop, so it can't be async.
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

pub struct TransactionGuard<T>
where
    T: Transaction,
{
    inner: T,
    committed: bool,
}

impl<T> TransactionGuard<T>
where
    T: Transaction,
{
    pub fn new(transaction: T) -> Self {
        Self {
            inner: transaction,
            committed: false,
        }
    }

    /// Commit the transaction. A failed commit is rolled back when `self` drops.
    pub async fn commit(mut self) -> Result<(), T::Error> {
        self.inner.commit().await?;
        self.committed = true;

        Ok(())
    }
}

impl<T> Deref for TransactionGuard<T>
where
    T: Transaction,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for TransactionGuard<T>
where
    T: Transaction,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T> Drop for TransactionGuard<T>
where
    T: Transaction,
{
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = self.inner.rollback() {
                log::error!("Error on transaction rollback: {}", err);
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GetError<IE>
where
    IE: std::error::Error,
{
    #[error("utxo with id={0} not found")]
    NotFound(U256),
    #[error("internal error: {0}")]
    Internal(IE),
}

#[derive(thiserror::Error, Debug)]
pub enum UpdateError<IE>
where
    IE: std::error::Error,
{
    #[error("internal error: {0}")]
    Internal(IE),
    #[error("utxo with id={0} not found")]
    NotFound(U256),
}
