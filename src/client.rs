//! Owner side of spend authorization: produces [`Input`]s that the ledger accepts.

use ethers_core::types::{Address, U256};
use ethers_signers::Signer;

use crate::signature;
use crate::types::{Input, Output};

/// Sign withdrawal of UTXO `id` to `recipient`.
pub async fn sign_withdraw<S: Signer>(
    signer: &S,
    id: U256,
    recipient: &Address,
) -> Result<Input, S::Error> {
    let message = signature::withdraw_message(&id, recipient);

    sign(signer, id, &message).await
}

/// Sign spending of UTXO `id` in a transfer that creates exactly `outputs`.
pub async fn sign_transfer<S: Signer>(
    signer: &S,
    id: U256,
    outputs: &[Output],
) -> Result<Input, S::Error> {
    let message = signature::transfer_message(&id, outputs);

    sign(signer, id, &message).await
}

async fn sign<S: Signer>(signer: &S, id: U256, message: &[u8]) -> Result<Input, S::Error> {
    let signature = signer.sign_message(signature::digest(message)).await?;

    log::debug!("signed spend of utxo {} by {:?}", id, signer.address());

    Ok(Input::new(id, signature.to_vec()))
}
