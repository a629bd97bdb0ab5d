// ============================================================================
// Audit Module
// Sinks for refused submissions
// ============================================================================

mod file;
mod memory;

pub use file::FileAuditLog;
pub use memory::MemoryAuditLog;
