// ============================================================================
// Error Taxonomy
// Every failure a submission can meet, classified
// ============================================================================

use crate::domain::OrderId;
use crate::numeric::NumericError;
use thiserror::Error;

/// Top-level error for a submission or engine operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("malformed submission: {0}")]
    Shape(#[from] ShapeError),

    #[error("signature rejected for platform {platform}")]
    Authentication { platform: String },

    #[error("no signature scheme registered for platform {platform}")]
    UnknownPlatform { platform: String },

    #[error("storage fault: {0}")]
    Storage(#[from] LedgerError),

    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExchangeError {
    /// Rejections are written to the audit log; faults are not.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExchangeError::Shape(_)
                | ExchangeError::Authentication { .. }
                | ExchangeError::UnknownPlatform { .. }
        )
    }

    /// Short reason tag stored with audit entries and emitted in events.
    pub fn reason(&self) -> RejectReason {
        match self {
            ExchangeError::Shape(_) => RejectReason::Shape,
            ExchangeError::Authentication { .. } => RejectReason::Authentication,
            ExchangeError::UnknownPlatform { .. } => RejectReason::UnknownPlatform,
            ExchangeError::Storage(_) | ExchangeError::Numeric(_) | ExchangeError::Config(_) => {
                RejectReason::Fault
            }
        }
    }
}

/// Classification of a refused submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Shape,
    Authentication,
    UnknownPlatform,
    Fault,
}

/// The request did not have the shape of a signed order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object at {0}")]
    NotAnObject(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Both amounts are valid on their own but `buy_amount / sell_amount`
    /// has no decimal representation.
    #[error("exchange rate `buy_amount / sell_amount` is out of range: {0}")]
    RateOutOfRange(String),
}

/// Ledger failures. `AlreadyFilled` is a settlement conflict the engine
/// recovers from; everything else is a storage fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("order {id} is already filled")]
    AlreadyFilled { id: OrderId },

    #[error("order {id} does not exist")]
    NotFound { id: OrderId },

    #[error("order {id} cannot be matched against itself")]
    SelfMatch { id: OrderId },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("ledger capacity of {limit} orders reached")]
    CapacityExceeded { limit: usize },

    #[error("ledger unavailable")]
    Unavailable,
}

impl LedgerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::AlreadyFilled { .. })
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
pub type LedgerResult<T> = Result<T, LedgerError>;
