use crate::common::U256;
use alloy::transports::{RpcError, TransportErrorKind};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ContractError(#[from] alloy::contract::Error),
    #[error(transparent)]
    RpcError(#[from] RpcError<TransportErrorKind>),
    #[error(transparent)]
    PendingTransactionError(#[from] alloy::providers::PendingTransactionError),
    #[error("Input arrays differ in length: {0} != {1}")]
    LengthMismatch(usize, usize),
    #[error("Batch input is empty")]
    EmptyInput,
    #[error("Zero address recipient at position {0}")]
    InvalidRecipient(usize),
    #[error("Zero token address at position {0}")]
    InvalidToken(usize),
    #[error("Zero amount at position {0}")]
    ZeroAmount(usize),
    #[error("Attached value {actual} does not equal the amount sum {expected}")]
    ValueMismatch { expected: U256, actual: U256 },
}
