// ============================================================================
// Numeric Errors
// Failures while building or combining order amounts
// ============================================================================

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericError {
    #[error("amount must be strictly positive")]
    NonPositive,

    #[error("amount exceeds the decimal range")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    /// Text or JSON number that does not parse as a decimal
    #[error("not a decimal number")]
    InvalidInput,
}

pub type NumericResult<T> = Result<T, NumericError>;
