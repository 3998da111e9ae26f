//! # Outbound Ports
//!
//! Collaborators the engine and authenticator depend on: record lookup,
//! credential lookup, text blobs and the audit trail.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{AuditLogEntry, FileType, Record, StoreError, User};

/// Record lookup by `(type, id)`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a fresh copy of the record, or `None` if it does not exist.
    async fn get(&self, file_type: FileType, id: i64) -> Result<Option<Record>, StoreError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        match self.get(FileType::User, id).await? {
            Some(Record::User(user)) => Ok(Some(user)),
            _ => Ok(None),
        }
    }
}

/// Stored credential lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Encoded credential for `user_id` (`sha256$<salt-hex>$<digest-hex>`).
    async fn credential(&self, user_id: i64) -> Result<Option<String>, StoreError>;
}

/// Text blobs attached to records.
///
/// A missing blob is a value (the expunged placeholder), not an error.
#[async_trait]
pub trait TextStore: Send + Sync {
    async fn read(&self, file_type: FileType, id: i64, blob: &str) -> Result<String, StoreError>;

    /// Every blob under a record's sub-directory, keyed by file name.
    /// `None` when the directory itself is missing.
    async fn read_dir(
        &self,
        file_type: FileType,
        id: i64,
        dir: &str,
    ) -> Result<Option<BTreeMap<String, String>>, StoreError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError>;
}
