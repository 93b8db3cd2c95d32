use std::fmt;

use ethers_core::types::{Address, U256};

use crate::signature;
use crate::storage::{GetError, UpdateError};

/// Caller visible category of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyOutputs,
    EmptyInputs,
    TooManyOutputs,
    ZeroAmount,
    UtxoNotExist,
    AlreadySpent,
    TokenMismatch,
    AmountMismatch,
    AmountOverflow,
    InvalidSignature,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmptyOutputs => "EmptyOutputs",
            ErrorKind::EmptyInputs => "EmptyInputs",
            ErrorKind::TooManyOutputs => "TooManyOutputs",
            ErrorKind::ZeroAmount => "ZeroAmount",
            ErrorKind::UtxoNotExist => "UTXONotExist",
            ErrorKind::AlreadySpent => "AlreadySpent",
            ErrorKind::TokenMismatch => "TokenMismatch",
            ErrorKind::AmountMismatch => "AmountMismatch",
            ErrorKind::AmountOverflow => "AmountOverflow",
            ErrorKind::InvalidSignature => "InvalidSignature",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DepositError<SE, GE>
where
    SE: std::error::Error,
    GE: std::error::Error,
{
    #[error("empty outputs")]
    EmptyOutputs,
    #[error("too many outputs: {got}, max: {max}")]
    TooManyOutputs { max: usize, got: usize },
    #[error("output {0} has zero amount")]
    ZeroAmount(usize),
    #[error("failed to pull tokens: {0}")]
    Gateway(GE),
    #[error("failed to refund {pulled} pulled tokens: {refund}")]
    Refund { pulled: U256, refund: GE },
    #[error("internal storage error: {0}")]
    Storage(SE),
}

impl<SE, GE> DepositError<SE, GE>
where
    SE: std::error::Error,
    GE: std::error::Error,
{
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::EmptyOutputs => Some(ErrorKind::EmptyOutputs),
            Self::TooManyOutputs { .. } => Some(ErrorKind::TooManyOutputs),
            Self::ZeroAmount(_) => Some(ErrorKind::ZeroAmount),
            Self::Gateway(_) | Self::Refund { .. } | Self::Storage(_) => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WithdrawError<SE, GE>
where
    SE: std::error::Error,
    GE: std::error::Error,
{
    #[error("utxo doesn't exist id: {0}")]
    UtxoNotExist(U256),
    #[error("utxo has been spent id: {0}")]
    AlreadySpent(U256),
    #[error("invalid signature for utxo {id}: {source}")]
    InvalidSignature {
        id: U256,
        source: signature::Error,
    },
    #[error("failed to push tokens: {0}")]
    Gateway(GE),
    #[error("internal storage error: {0}")]
    Storage(SE),
}

impl<SE, GE> WithdrawError<SE, GE>
where
    SE: std::error::Error,
    GE: std::error::Error,
{
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UtxoNotExist(_) => Some(ErrorKind::UtxoNotExist),
            Self::AlreadySpent(_) => Some(ErrorKind::AlreadySpent),
            Self::InvalidSignature { .. } => Some(ErrorKind::InvalidSignature),
            Self::Gateway(_) | Self::Storage(_) => None,
        }
    }
}

impl<SE, GE> From<GetError<SE>> for WithdrawError<SE, GE>
where
    SE: std::error::Error,
    GE: std::error::Error,
{
    fn from(err: GetError<SE>) -> Self {
        match err {
            GetError::NotFound(id) => Self::UtxoNotExist(id),
            GetError::Internal(err) => Self::Storage(err),
        }
    }
}

impl<SE, GE> From<UpdateError<SE>> for WithdrawError<SE, GE>
where
    SE: std::error::Error,
    GE: std::error::Error,
{
    fn from(err: UpdateError<SE>) -> Self {
        match err {
            UpdateError::NotFound(id) => Self::UtxoNotExist(id),
            UpdateError::Internal(err) => Self::Storage(err),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransferError<SE>
where
    SE: std::error::Error,
{
    #[error("inputs can not be empty")]
    EmptyInputs,
    #[error("outputs can not be empty")]
    EmptyOutputs,
    #[error("output {0} has zero amount")]
    ZeroAmount(usize),
    #[error("utxo doesn't exist id: {0}")]
    UtxoNotExist(U256),
    #[error("utxo has been spent id: {0}")]
    AlreadySpent(U256),
    #[error("utxo {id} token mismatch, expected: {expected:?}, found: {found:?}")]
    TokenMismatch {
        id: U256,
        expected: Address,
        found: Address,
    },
    #[error("input and output amount mismatch: {inputs} != {outputs}")]
    AmountMismatch { inputs: U256, outputs: U256 },
    #[error("amount sum overflow")]
    AmountOverflow,
    #[error("invalid signature for utxo {id}: {source}")]
    InvalidSignature {
        id: U256,
        source: signature::Error,
    },
    #[error("internal storage error: {0}")]
    Storage(SE),
}

impl<SE> TransferError<SE>
where
    SE: std::error::Error,
{
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::EmptyInputs => Some(ErrorKind::EmptyInputs),
            Self::EmptyOutputs => Some(ErrorKind::EmptyOutputs),
            Self::ZeroAmount(_) => Some(ErrorKind::ZeroAmount),
            Self::UtxoNotExist(_) => Some(ErrorKind::UtxoNotExist),
            Self::AlreadySpent(_) => Some(ErrorKind::AlreadySpent),
            Self::TokenMismatch { .. } => Some(ErrorKind::TokenMismatch),
            Self::AmountMismatch { .. } => Some(ErrorKind::AmountMismatch),
            Self::AmountOverflow => Some(ErrorKind::AmountOverflow),
            Self::InvalidSignature { .. } => Some(ErrorKind::InvalidSignature),
            Self::Storage(_) => None,
        }
    }
}

impl<SE> From<GetError<SE>> for TransferError<SE>
where
    SE: std::error::Error,
{
    fn from(err: GetError<SE>) -> Self {
        match err {
            GetError::NotFound(id) => Self::UtxoNotExist(id),
            GetError::Internal(err) => Self::Storage(err),
        }
    }
}

impl<SE> From<UpdateError<SE>> for TransferError<SE>
where
    SE: std::error::Error,
{
    fn from(err: UpdateError<SE>) -> Self {
        match err {
            UpdateError::NotFound(id) => Self::UtxoNotExist(id),
            UpdateError::Internal(err) => Self::Storage(err),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GetUtxoError<SE>
where
    SE: std::error::Error,
{
    #[error("utxo doesn't exist id: {0}")]
    UtxoNotExist(U256),
    #[error("internal storage error: {0}")]
    Storage(SE),
}

impl<SE> GetUtxoError<SE>
where
    SE: std::error::Error,
{
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UtxoNotExist(_) => Some(ErrorKind::UtxoNotExist),
            Self::Storage(_) => None,
        }
    }
}

impl<SE> From<GetError<SE>> for GetUtxoError<SE>
where
    SE: std::error::Error,
{
    fn from(err: GetError<SE>) -> Self {
        match err {
            GetError::NotFound(id) => Self::UtxoNotExist(id),
            GetError::Internal(err) => Self::Storage(err),
        }
    }
}
