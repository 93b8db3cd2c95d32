//! Construction and verification of spend authorizations.
//!
//! A spend is authorized by an ECDSA signature over an EIP-191 personal message
//! whose payload is `keccak256` of the packed spend description:
//!
//! ```ignore
//! withdraw:  id (32 bytes, big endian) | recipient (20 bytes)
//! transfer:  id (32 bytes, big endian) | amount_1 | owner_1 | amount_2 | owner_2 | ...
//! ```
//!
//! The destination is a part of the message, so a signature can't be reused to
//! send the same UTXO somewhere else.

use std::mem::size_of;

use ethers_core::abi::AbiEncode;
use ethers_core::types::{Address, RecoveryMessage, Signature, SignatureError, U256};
use ethers_core::utils::keccak256;

use crate::types::Output;

const ADDRESS_SIZE: usize = size_of::<Address>();
const U256_SIZE: usize = size_of::<U256>();

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed signature: {0}")]
    Malformed(SignatureError),
    #[error("failed to recover signer: {0}")]
    Recovery(SignatureError),
    #[error("signature recovers to zero address")]
    ZeroAddress,
    #[error("signer mismatch, expected: {expected:?}, recovered: {recovered:?}")]
    SignerMismatch {
        expected: Address,
        recovered: Address,
    },
}

/// Message that the owner of UTXO `id` signs to withdraw it to `recipient`.
pub fn withdraw_message(id: &U256, recipient: &Address) -> Vec<u8> {
    let mut message = Vec::with_capacity(U256_SIZE + ADDRESS_SIZE);

    message.extend_from_slice(&id.encode());
    message.extend_from_slice(recipient.as_bytes());

    message
}

/// Message that the owner of UTXO `id` signs to spend it in a transfer
/// creating `outputs`. Every input of the transfer commits to the whole batch.
pub fn transfer_message(id: &U256, outputs: &[Output]) -> Vec<u8> {
    let packed = pack_outputs(outputs);

    let mut message = Vec::with_capacity(U256_SIZE + packed.len());
    message.extend_from_slice(&id.encode());
    message.extend_from_slice(&packed);

    message
}

/// Pack outputs as `amount | owner` pairs.
pub fn pack_outputs(outputs: &[Output]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(outputs.len() * (U256_SIZE + ADDRESS_SIZE));

    for output in outputs {
        packed.extend_from_slice(&output.amount.encode());
        packed.extend_from_slice(output.owner.as_bytes());
    }

    packed
}

/// Digest that is actually passed to the signer as a personal message.
pub fn digest(message: &[u8]) -> [u8; 32] {
    keccak256(message)
}

/// Recover address of the account that signed `message`.
pub fn recover(message: &[u8], signature: &[u8]) -> Result<Address, Error> {
    let signature = Signature::try_from(signature).map_err(Error::Malformed)?;

    let recovered = signature
        .recover(RecoveryMessage::Data(digest(message).to_vec()))
        .map_err(Error::Recovery)?;

    if recovered.is_zero() {
        return Err(Error::ZeroAddress);
    }

    Ok(recovered)
}

/// Check that `message` was signed by `expected`.
pub fn verify(message: &[u8], signature: &[u8], expected: &Address) -> Result<(), Error> {
    let recovered = recover(message, signature)?;

    if recovered != *expected {
        return Err(Error::SignerMismatch {
            expected: *expected,
            recovered,
        });
    }

    Ok(())
}
