use ethers_core::types::{Address, Bytes, U256};

/// Single unit of value ownership in the ledger.
///
/// Only `is_spent` ever changes after creation, and only from `false` to `true`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub id: U256,
    pub token: Address,
    pub amount: U256,
    pub owner: Address,
    pub is_spent: bool,
}

impl Utxo {
    pub fn new(id: U256, token: Address, amount: U256, owner: Address) -> Self {
        Self {
            id,
            token,
            amount,
            owner,
            is_spent: false,
        }
    }
}

/// Description of a UTXO that should be created by deposit or transfer.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub amount: U256,
    pub owner: Address,
}

impl Output {
    pub fn new(amount: impl Into<U256>, owner: Address) -> Self {
        Self {
            amount: amount.into(),
            owner,
        }
    }
}

/// Spend of the UTXO with `id`, authorized by the owner's signature.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub id: U256,
    pub signature: Bytes,
}

impl Input {
    pub fn new(id: impl Into<U256>, signature: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            signature: signature.into(),
        }
    }
}
