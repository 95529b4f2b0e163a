//! Token Ledger Errors

use lib_types::Amount;
use thiserror::Error;

/// Error during token operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Zero address cannot take part in this operation")]
    ZeroAddress,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Transfer amount {amount} exceeds the max transaction limit {max}")]
    TxLimitExceeded { amount: Amount, max: Amount },

    #[error("Caller is not the owner")]
    NotOwner,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Liquidity conversion failed: {0}")]
    LiquidityConversionFailed(String),

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
