pub mod in_memory;

use async_trait::async_trait;
use ethers_core::types::{Address, U256};

/// Fungible token service that holds the value backing the ledger.
///
/// Implementations act on behalf of the ledger's custody account, the same way
/// an ERC-20 contract acts on behalf of `msg.sender`.
#[async_trait]
pub trait TokenGateway: Sync + Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Account that holds the value of all unspent UTXOs.
    fn custody(&self) -> Address;

    /// Move `amount` of `token` from `from` to `to` using allowance given to custody.
    async fn transfer_from(
        &self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &U256,
    ) -> Result<(), Self::Error>;

    /// Move `amount` of `token` from custody to `to`.
    async fn transfer(&self, token: &Address, to: &Address, amount: &U256)
        -> Result<(), Self::Error>;
}
