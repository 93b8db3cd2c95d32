use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use ethers_core::types::{Address, U256};
use tokio::sync::Mutex;

use super::TokenGateway;

type BalanceKey = (Address, Address);
type AllowanceKey = (Address, Address, Address);

#[derive(Debug, Default)]
struct Books {
    /// (token, holder) -> balance
    balances: HashMap<BalanceKey, U256>,
    /// (token, owner, spender) -> allowance
    allowances: HashMap<AllowanceKey, U256>,
}

impl Books {
    fn balance(&self, token: &Address, holder: &Address) -> U256 {
        self.balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or_default()
    }

    fn move_balance(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &U256,
    ) -> Result<(), Error> {
        let balance = self.balance(token, from);
        let remaining = balance
            .checked_sub(*amount)
            .ok_or(Error::InsufficientBalance {
                token: *token,
                holder: *from,
                balance,
                amount: *amount,
            })?;

        if from == to {
            return Ok(());
        }

        let received = self
            .balance(token, to)
            .checked_add(*amount)
            .ok_or(Error::Overflow)?;

        self.balances.insert((*token, *from), remaining);
        self.balances.insert((*token, *to), received);

        Ok(())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("insufficient balance of {token:?} for {holder:?}: {balance} < {amount}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        balance: U256,
        amount: U256,
    },
    #[error("insufficient allowance of {token:?} from {owner:?}: {allowance} < {amount}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        allowance: U256,
        amount: U256,
    },
    #[error("balance overflow")]
    Overflow,
}

/// ERC-20 like token book kept in memory, operated by the `custody` account.
#[derive(Clone, Debug)]
pub struct MapGateway {
    custody: Address,
    books: Arc<Mutex<Books>>,
}

impl MapGateway {
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            books: Arc::new(Mutex::new(Books::default())),
        }
    }

    pub async fn mint(&self, token: &Address, to: &Address, amount: &U256) -> Result<(), Error> {
        let mut books = self.books.lock().await;

        let balance = books
            .balance(token, to)
            .checked_add(*amount)
            .ok_or(Error::Overflow)?;
        books.balances.insert((*token, *to), balance);

        Ok(())
    }

    pub async fn approve(&self, token: &Address, owner: &Address, spender: &Address, amount: &U256) {
        let mut books = self.books.lock().await;

        books.allowances.insert((*token, *owner, *spender), *amount);
    }

    pub async fn balance_of(&self, token: &Address, holder: &Address) -> U256 {
        self.books.lock().await.balance(token, holder)
    }

    pub async fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> U256 {
        self.books
            .lock()
            .await
            .allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TokenGateway for MapGateway {
    type Error = Error;

    fn custody(&self) -> Address {
        self.custody
    }

    async fn transfer_from(
        &self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &U256,
    ) -> Result<(), Self::Error> {
        let mut books = self.books.lock().await;

        let key = (*token, *from, self.custody);
        let allowance = books.allowances.get(&key).copied().unwrap_or_default();
        let remaining = allowance
            .checked_sub(*amount)
            .ok_or(Error::InsufficientAllowance {
                token: *token,
                owner: *from,
                allowance,
                amount: *amount,
            })?;

        books.move_balance(token, from, to, amount)?;
        books.allowances.insert(key, remaining);

        Ok(())
    }

    async fn transfer(
        &self,
        token: &Address,
        to: &Address,
        amount: &U256,
    ) -> Result<(), Self::Error> {
        let custody = self.custody;

        self.books
            .lock()
            .await
            .move_balance(token, &custody, to, amount)
    }
}
