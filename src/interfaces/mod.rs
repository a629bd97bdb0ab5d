// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod audit_log;
mod event_handler;
mod order_ledger;
mod signature_scheme;

pub use audit_log::{AuditLog, LogEntry};
pub use event_handler::{
    EventHandler, ExchangeEvent, LoggingEventHandler, NoOpEventHandler, RecordingEventHandler,
};
pub use order_ledger::{CrossingQuery, OrderLedger, Settlement, SettlementReceipt};
pub use signature_scheme::SignatureScheme;
