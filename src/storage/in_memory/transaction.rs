use async_trait::async_trait;
use ethers_core::types::{Address, U256};
use tokio::sync::OwnedMutexGuard;

use crate::{
    storage::{GetError, Transaction, UpdateError},
    types::Utxo,
};

use super::{InternalError, State};

/// Holds the storage lock until dropped, so only one transaction
/// exists at a time and readers wait for it to finish.
///
/// Changes are applied in place and journaled to be reverted on rollback.
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<State>,
    appended: usize,
    spent: Vec<usize>,
}

impl InMemoryTransaction {
    pub(crate) fn new(state: OwnedMutexGuard<State>) -> Self {
        Self {
            state,
            appended: 0,
            spent: Vec::new(),
        }
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    type Error = InternalError;

    async fn get(&self, id: &U256) -> Result<Utxo, GetError<Self::Error>> {
        self.state.get(id).cloned().ok_or(GetError::NotFound(*id))
    }

    async fn append(
        &mut self,
        token: Address,
        amount: U256,
        owner: Address,
    ) -> Result<U256, Self::Error> {
        let state = &mut *self.state;

        let id = U256::from(state.utxos.len());
        state.utxos.push(Utxo::new(id, token, amount, owner));
        state.by_owner.entry(owner).or_default().push(id);

        self.appended += 1;

        Ok(id)
    }

    async fn mark_spent(&mut self, id: &U256) -> Result<(), UpdateError<Self::Error>> {
        let position = self.state.position(id).ok_or(UpdateError::NotFound(*id))?;

        self.state.utxos[position].is_spent = true;
        self.spent.push(position);

        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Self::Error> {
        self.appended = 0;
        self.spent.clear();

        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        let state = &mut *self.state;

        for position in self.spent.drain(..).rev() {
            if let Some(utxo) = state.utxos.get_mut(position) {
                utxo.is_spent = false;
            }
        }

        for _ in 0..self.appended {
            let Some(utxo) = state.utxos.pop() else {
                break;
            };

            if let Some(ids) = state.by_owner.get_mut(&utxo.owner) {
                ids.pop();
                if ids.is_empty() {
                    state.by_owner.remove(&utxo.owner);
                }
            }
        }

        if self.appended > 0 {
            log::debug!("rolled back {} appended utxos", self.appended);
        }
        self.appended = 0;

        Ok(())
    }
}
