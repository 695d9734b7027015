//! Domain-specific error types for the clicker engine.
//!
//! Validation and authorization failures are recoverable and never mutate
//! state. Faults indicate an accounting bug and must abort the operation.

use thiserror::Error;

/// Fatal accounting faults. These are never absorbed or retried.
#[derive(Error, Debug)]
pub enum FaultError {
    #[error("pending rewards {pending} exceed held funds {held}")]
    PendingExceedsHeld { pending: u128, held: u128 },

    #[error("held funds overflow adding {amount}")]
    BalanceOverflow { amount: u128 },

    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),
}

/// Unified engine error type.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("identity {0} already has an account")]
    DuplicateIdentity(String),

    #[error("username '{0}' is reserved")]
    ReservedUsername(String),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("referrer '{0}' is not registered")]
    UnknownReferrer(String),

    #[error("identity {0} is not registered")]
    NotRegistered(String),

    #[error("incorrect click fee: required {required}, got {paid}")]
    IncorrectFee { required: u128, paid: u128 },

    #[error("no multiplier tier costs {0} base units")]
    InvalidTier(u128),

    #[error("nothing to claim")]
    NothingToClaim,

    #[error("caller {0} is not authorized to settle")]
    Unauthorized(String),

    #[error("accounting fault: {0}")]
    Fault(#[from] FaultError),

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<Box<bincode::ErrorKind>> for EngineError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
