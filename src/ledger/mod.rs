// ============================================================================
// Ledger Module
// Transactional order storage
// ============================================================================

mod memory;
mod transaction;

pub use memory::InMemoryLedger;
pub use transaction::LedgerTransaction;
