// ============================================================================
// In-Memory Audit Log
// ============================================================================

use crate::error::RejectReason;
use crate::interfaces::{AuditLog, LogEntry};
use parking_lot::RwLock;

/// Audit entries kept in process memory, in append order.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry. Forensic use only.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn count(&self, reason: RejectReason) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.reason == reason)
            .count()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entry: LogEntry) {
        self.entries.write().push(entry);
    }
}
