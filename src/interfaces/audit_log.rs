// ============================================================================
// Audit Log Interface
// Append-only record of refused submissions
// ============================================================================

use crate::error::RejectReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One refused submission, kept for forensic replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    /// The raw request, serialized as it was received
    pub message: String,
    pub reason: RejectReason,
    pub received_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, reason: RejectReason, received_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            reason,
            received_at,
        }
    }
}

/// Sink for refused submissions.
///
/// `append` must not fail or block the submission path; implementations that
/// can fail (files, remote stores) swallow the error into a `tracing` warning.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: LogEntry);
}
