// ============================================================================
// Engine Module
// Contains the core matching engine business logic
// ============================================================================

mod matching_engine;
mod settlement;

pub mod factory;

#[cfg(feature = "async")]
pub mod async_api;

pub use factory::{create_from_config, ExchangeBuilder};
pub use matching_engine::{MatchingEngine, Submission};
pub use settlement::derive_remainder;
