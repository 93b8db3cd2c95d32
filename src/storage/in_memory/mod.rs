pub mod transaction;

#[cfg(test)]
pub(crate) mod faulty;

use std::{collections::HashMap, ops::Range, sync::Arc};

use async_trait::async_trait;
use ethers_core::types::{Address, U256};
use tokio::sync::Mutex;

use crate::types::Utxo;

use self::transaction::InMemoryTransaction;

use super::{GetError, TransactionGuard};

#[derive(Debug, Default)]
pub(crate) struct State {
    /// All UTXOs ever created, position in the vector is the id.
    utxos: Vec<Utxo>,
    /// Ids of UTXOs by owner, in creation order.
    by_owner: HashMap<Address, Vec<U256>>,
}

impl State {
    fn position(&self, id: &U256) -> Option<usize> {
        // `as_usize` can't overflow after the bound check
        (*id < U256::from(self.utxos.len())).then(|| id.as_usize())
    }

    fn get(&self, id: &U256) -> Option<&Utxo> {
        self.position(id).map(|position| &self.utxos[position])
    }

    fn get_many<E>(&self, ids: &[U256]) -> Result<Vec<Utxo>, GetError<E>>
    where
        E: std::error::Error,
    {
        ids.iter()
            .map(|id| self.get(id).cloned().ok_or(GetError::NotFound(*id)))
            .collect()
    }

    fn list(&self, offset: &U256, limit: &U256) -> Vec<Utxo> {
        self.utxos[page(self.utxos.len(), offset, limit)].to_vec()
    }

    fn list_by_owner(&self, owner: &Address, offset: &U256, limit: &U256) -> Vec<Utxo> {
        let Some(ids) = self.by_owner.get(owner) else {
            return Vec::new();
        };

        ids[page(ids.len(), offset, limit)]
            .iter()
            .filter_map(|id| self.get(id).cloned())
            .collect()
    }
}

/// Range of `[offset, offset + limit)` clipped to `len`.
fn page(len: usize, offset: &U256, limit: &U256) -> Range<usize> {
    let len = U256::from(len);
    if *offset >= len {
        return 0..0;
    }

    let end = offset.saturating_add(*limit).min(len);

    offset.as_usize()..end.as_usize()
}

/// Storage that keeps all UTXOs in memory behind a single lock.
#[derive(Clone, Default)]
pub struct MapStorage {
    state: Arc<Mutex<State>>,
}

impl MapStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InternalError {}

#[async_trait]
impl super::Storage for MapStorage {
    type InternalError = InternalError;
    type Transaction = InMemoryTransaction;

    async fn transaction(
        &self,
    ) -> Result<TransactionGuard<Self::Transaction>, Self::InternalError> {
        let state = Arc::clone(&self.state).lock_owned().await;

        Ok(TransactionGuard::new(InMemoryTransaction::new(state)))
    }

    async fn len(&self) -> Result<U256, Self::InternalError> {
        let state = self.state.lock().await;

        Ok(U256::from(state.utxos.len()))
    }

    async fn get(&self, id: &U256) -> Result<Utxo, GetError<Self::InternalError>> {
        let state = self.state.lock().await;

        state.get(id).cloned().ok_or(GetError::NotFound(*id))
    }

    async fn get_many(&self, ids: &[U256]) -> Result<Vec<Utxo>, GetError<Self::InternalError>> {
        let state = self.state.lock().await;

        state.get_many(ids)
    }

    async fn list(
        &self,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, Self::InternalError> {
        let state = self.state.lock().await;

        Ok(state.list(offset, limit))
    }

    async fn list_by_owner(
        &self,
        owner: &Address,
        offset: &U256,
        limit: &U256,
    ) -> Result<Vec<Utxo>, Self::InternalError> {
        let state = self.state.lock().await;

        Ok(state.list_by_owner(owner, offset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Storage, Transaction};

    const TOKEN: Address = Address::repeat_byte(0x70);
    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);

    async fn storage_with(amounts: &[(u64, Address)]) -> MapStorage {
        let storage = MapStorage::new();
        let mut tx = storage.transaction().await.unwrap();
        for (amount, owner) in amounts {
            tx.append(TOKEN, U256::from(*amount), *owner).await.unwrap();
        }
        tx.commit().await.unwrap();

        storage
    }

    #[tokio::test]
    async fn ids_are_dense() {
        let storage = storage_with(&[(1, ALICE), (2, BOB), (3, ALICE)]).await;

        assert_eq!(storage.len().await.unwrap(), U256::from(3));
        for id in 0..3u64 {
            let utxo = storage.get(&U256::from(id)).await.unwrap();
            assert_eq!(utxo.id, U256::from(id));
            assert_eq!(utxo.amount, U256::from(id + 1));
            assert!(!utxo.is_spent);
        }
        assert!(matches!(
            storage.get(&U256::from(3)).await,
            Err(GetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_many_fails_fast() {
        let storage = storage_with(&[(1, ALICE), (2, BOB)]).await;

        let utxos = storage
            .get_many(&[U256::from(1), U256::zero()])
            .await
            .unwrap();
        assert_eq!(utxos[0].owner, BOB);
        assert_eq!(utxos[1].owner, ALICE);

        assert!(matches!(
            storage.get_many(&[U256::zero(), U256::from(5)]).await,
            Err(GetError::NotFound(id)) if id == U256::from(5)
        ));
    }

    #[tokio::test]
    async fn pagination_is_clipped() {
        let storage = storage_with(&[(1, ALICE), (2, BOB), (3, ALICE), (4, ALICE)]).await;

        let page = storage.list(&U256::one(), &U256::from(2)).await.unwrap();
        assert_eq!(
            page.iter().map(|u| u.id.as_u64()).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let tail = storage.list(&U256::from(3), &U256::from(10)).await.unwrap();
        assert_eq!(tail.len(), 1);

        assert!(storage.list(&U256::from(4), &U256::one()).await.unwrap().is_empty());
        assert!(storage.list(&U256::MAX, &U256::MAX).await.unwrap().is_empty());
        assert_eq!(
            storage.list(&U256::zero(), &U256::MAX).await.unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn lists_by_owner_in_creation_order() {
        let storage = storage_with(&[(1, ALICE), (2, BOB), (3, ALICE), (4, ALICE)]).await;

        let alice = storage
            .list_by_owner(&ALICE, &U256::one(), &U256::from(10))
            .await
            .unwrap();
        assert_eq!(
            alice.iter().map(|u| u.id.as_u64()).collect::<Vec<_>>(),
            vec![2, 3]
        );

        let nobody = storage
            .list_by_owner(&Address::zero(), &U256::zero(), &U256::from(10))
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn dropped_transaction_is_rolled_back() {
        let storage = storage_with(&[(1, ALICE)]).await;

        {
            let mut tx = storage.transaction().await.unwrap();
            tx.mark_spent(&U256::zero()).await.unwrap();
            tx.append(TOKEN, U256::from(5), BOB).await.unwrap();
            tx.append(TOKEN, U256::from(6), ALICE).await.unwrap();
        }

        assert_eq!(storage.len().await.unwrap(), U256::one());
        assert!(!storage.get(&U256::zero()).await.unwrap().is_spent);
        assert!(storage
            .list_by_owner(&BOB, &U256::zero(), &U256::from(10))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            storage
                .list_by_owner(&ALICE, &U256::zero(), &U256::from(10))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn committed_spend_is_visible() {
        let storage = storage_with(&[(1, ALICE)]).await;

        let mut tx = storage.transaction().await.unwrap();
        tx.mark_spent(&U256::zero()).await.unwrap();
        assert!(matches!(
            tx.mark_spent(&U256::one()).await,
            Err(crate::storage::UpdateError::NotFound(_))
        ));
        tx.commit().await.unwrap();

        assert!(storage.get(&U256::zero()).await.unwrap().is_spent);
    }

    #[tokio::test]
    async fn failed_commit_is_rolled_back() {
        use super::faulty::{FaultyStorage, Step};

        let storage = FaultyStorage::new();
        let mut tx = storage.transaction().await.unwrap();
        tx.append(TOKEN, U256::from(1), ALICE).await.unwrap();
        tx.commit().await.unwrap();

        storage.faults().fail_on(Step::Commit);

        let mut tx = storage.transaction().await.unwrap();
        tx.mark_spent(&U256::zero()).await.unwrap();
        tx.append(TOKEN, U256::from(2), BOB).await.unwrap();
        assert!(tx.commit().await.is_err());

        assert_eq!(storage.len().await.unwrap(), U256::one());
        assert!(!storage.get(&U256::zero()).await.unwrap().is_spent);
        assert!(storage
            .list_by_owner(&BOB, &U256::zero(), &U256::from(10))
            .await
            .unwrap()
            .is_empty());
    }
}
