// ============================================================================
// Numeric Module
// Positive decimal amounts and exchange-rate arithmetic
// ============================================================================
//
// This module provides:
// - Amount: strictly positive decimal quantity
// - NumericError: Error types for amount arithmetic
//
// Design principles:
// - No floating-point operations
// - All arithmetic returns Result (no panics)
// - Rate comparisons are done by cross-multiplication, never by rounded division

mod amount;
mod errors;

pub use amount::{exchange_rate, rate_not_above, Amount};
pub use errors::{NumericError, NumericResult};
