//! Audit sinks.
//!
//! Both sinks mirror each entry as a `tracing` event under target `audit`;
//! the sink itself stays the system of record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::domain::{AuditLogEntry, StoreError};
use crate::ports::AuditSink;

fn mirror(entry: &AuditLogEntry) {
    if entry.success {
        info!(
            target: "audit",
            user_id = entry.user_id,
            ip = %entry.ip,
            action = %entry.action,
            success = true,
            "{}", entry.details
        );
    } else {
        warn!(
            target: "audit",
            user_id = entry.user_id,
            ip = %entry.ip,
            action = %entry.action,
            success = false,
            "{}", entry.details
        );
    }
}

/// Append-only in-memory trail.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        mirror(&entry);
        self.entries.lock().push(entry);
        Ok(())
    }
}

/// One JSON document per line, appended to a file.
///
/// The file is opened in append mode and never truncated.
#[derive(Debug)]
pub struct JsonLinesAuditLog {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl JsonLinesAuditLog {
    /// Open (creating if needed) the log at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        mirror(&entry);
        let mut line =
            serde_json::to_vec(&entry).map_err(|e| StoreError::Parse(e.to_string()))?;
        line.push(b'\n');

        // One write per entry under the lock keeps lines whole across
        // concurrent sessions.
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
