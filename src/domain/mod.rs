// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod config;
pub mod order;
pub mod order_book;
pub mod submission;
pub mod trade;

pub use config::{ExchangeConfig, ALGORAND, DEFAULT_MAX_SETTLEMENT_ATTEMPTS, ETHEREUM};
pub use order::{Fill, NewOrder, Order, OrderId};
pub use order_book::{OrderBookEntry, OrderBookSnapshot};
pub use submission::{OrderPayload, SignedOrder, WireAmount, PAYLOAD_FIELDS, REQUIRED_FIELDS};
pub use trade::Trade;

// Re-export state machine
pub use submission::state::{SubmissionState, SubmissionTransition};
