//! [`MapStorage`] with switchable write failures, for testing how callers
//! recover from a storage that breaks in the middle of an operation.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use ethers_core::types::{Address, U256};

use crate::{
    storage::{GetError, Storage, Transaction, TransactionGuard, UpdateError},
    types::Utxo,
};

use super::{transaction::InMemoryTransaction, InternalError, MapStorage};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("injected failure of {0:?}")]
pub struct Injected(pub Step);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Append,
    MarkSpent,
    Commit,
}

/// Which transaction steps fail. Shared between the storage and the test.
#[derive(Debug, Default)]
pub struct Faults {
    append: AtomicBool,
    mark_spent: AtomicBool,
    commit: AtomicBool,
}

impl Faults {
    fn flag(&self, step: Step) -> &AtomicBool {
        match step {
            Step::Append => &self.append,
            Step::MarkSpent => &self.mark_spent,
            Step::Commit => &self.commit,
        }
    }

    pub fn fail_on(&self, step: Step) {
        self.flag(step).store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        for step in [Step::Append, Step::MarkSpent, Step::Commit] {
            self.flag(step).store(false, Ordering::SeqCst);
        }
    }

    fn check(&self, step: Step) -> Result<(), Injected> {
        if self.flag(step).load(Ordering::SeqCst) {
            return Err(Injected(step));
        }

        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FaultyStorage {
    inner: MapStorage,
    faults: Arc<Faults>,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Arc<Faults> {
        Arc::clone(&self.faults)
    }
}

fn get_error(err: GetError<InternalError>) -> GetError<Injected> {
    match err {
        GetError::NotFound(id) => GetError::NotFound(id),
        GetError::Internal(err) => match err {},
    }
}

fn update_error(err: UpdateError<InternalError>) -> UpdateError<Injected> {
    match err {
        UpdateError::NotFound(id) => UpdateError::NotFound(id),
        UpdateError::Internal(err) => match err {},
    }
}

fn internal(err: InternalError) -> Injected {
    match err {}
}

#[async_trait]
impl Storage for FaultyStorage {
    type InternalError = Injected;
    type Transaction = FaultyTransaction;

    async fn transaction(
        &self,
    ) -> Result<TransactionGuard<Self::Transaction>, Self::InternalError> {
        let state = Arc::clone(&self.inner.state).lock_owned().await;

        Ok(TransactionGuard::new(FaultyTransaction {
            inner: InMemoryTransaction::new(state),
            faults: self.faults(),
        }))
    }

    async fn len(&self) -> Result<U256, Self::InternalError> {
        self.inner.len().await.map_err(internal)
    }

    async fn get(&self, id: &U256) -> Result<Utxo, GetError<Self::InternalError>> {
        self.inner.get(id).await.map_err(get_error)
    }

    async fn get_many(&self, ids: &[U256]) -> Result<Vec<Utxo>, GetError<Self::InternalError>> {
        self.inner.get_many(ids).await.map_err(get_error)
    }

    async fn list(
        &self,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, Self::InternalError> {
        self.inner.list(offset, limit).await.map_err(internal)
    }

    async fn list_by_owner(
        &self,
        owner: &Address,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, Self::InternalError> {
        self.inner
            .list_by_owner(owner, offset, limit)
            .await
            .map_err(internal)
    }
}

pub struct FaultyTransaction {
    inner: InMemoryTransaction,
    faults: Arc<Faults>,
}

#[async_trait]
impl Transaction for FaultyTransaction {
    type Error = Injected;

    async fn get(&self, id: &U256) -> Result<Utxo, GetError<Self::Error>> {
        self.inner.get(id).await.map_err(get_error)
    }

    async fn append(
        &mut self,
        token: Address,
        amount: U256,
        owner: Address,
    ) -> Result<U256, Self::Error> {
        self.faults.check(Step::Append)?;

        self.inner.append(token, amount, owner).await.map_err(internal)
    }

    async fn mark_spent(&mut self, id: &U256) -> Result<(), UpdateError<Self::Error>> {
        self.faults
            .check(Step::MarkSpent)
            .map_err(UpdateError::Internal)?;

        self.inner.mark_spent(id).await.map_err(update_error)
    }

    async fn commit(&mut self) -> Result<(), Self::Error> {
        self.faults.check(Step::Commit)?;

        self.inner.commit().await.map_err(internal)
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.inner.rollback().map_err(internal)
    }
}
