// ============================================================================
// File Audit Log
// JSON-lines file written by a background thread
// ============================================================================

use crate::interfaces::{AuditLog, LogEntry};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Appends one JSON object per line to a file.
///
/// `append` only enqueues; a dedicated writer thread does the I/O, so a slow
/// or failing disk never stalls a submission. Write failures are reported
/// through `tracing` and the entry is dropped. Dropping the log drains the
/// queue and flushes the file.
pub struct FileAuditLog {
    path: PathBuf,
    sender: Option<Sender<LogEntry>>,
    writer: Option<JoinHandle<()>>,
}

impl FileAuditLog {
    /// Open (or create) `path` for appending and start the writer thread.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (sender, receiver) = unbounded();

        let writer = thread::Builder::new()
            .name("audit-log-writer".to_string())
            .spawn(move || write_entries(file, receiver))?;

        tracing::debug!(path = %path.display(), "audit log opened");
        Ok(Self {
            path,
            sender: Some(sender),
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, entry: LogEntry) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(entry).is_err() {
            tracing::warn!(path = %self.path.display(), "audit writer has stopped; entry dropped");
        }
    }
}

impl Drop for FileAuditLog {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop once the queue is drained
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::warn!(path = %self.path.display(), "audit writer panicked");
            }
        }
    }
}

fn write_entries(file: File, receiver: Receiver<LogEntry>) {
    let mut out = BufWriter::new(file);
    for entry in receiver.iter() {
        if let Err(e) = write_line(&mut out, &entry) {
            tracing::warn!(entry_id = %entry.id, error = %e, "failed to write audit entry");
        }
        if receiver.is_empty() {
            if let Err(e) = out.flush() {
                tracing::warn!(error = %e, "failed to flush audit log");
            }
        }
    }
    if let Err(e) = out.flush() {
        tracing::warn!(error = %e, "failed to flush audit log");
    }
}

fn write_line(out: &mut impl Write, entry: &LogEntry) -> io::Result<()> {
    serde_json::to_writer(&mut *out, entry)?;
    out.write_all(b"\n")
}
