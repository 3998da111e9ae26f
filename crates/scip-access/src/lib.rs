//! # SCiPnet Access
//!
//! Clearance-level access control over deepwell records.
//!
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Policy
//!
//! | Record | Opens when |
//! |--------|-----------|
//! | SCP    | user clearance ≥ SCP clearance |
//! | USER   | user clearance ≥ that user's clearance |
//! | SITE   | user assigned to the site, or clearance ≥ 3 |
//! | MTF    | always (any authenticated user) |
//!
//! An unknown type yields `access_type_fail`, a missing record
//! `access_expunged`, a failed gate `access_redacted`. Each decision is
//! appended to the audit trail.
//!
//! ## Module Structure
//!
//! ```text
//! scip-access/
//! ├── domain/       # ClearanceLevel, FileType, records, audit entries, errors
//! ├── ports/        # Authenticator, AccessApi (inbound); stores + audit sink (outbound)
//! ├── adapters/     # arena store, deepwell loader, text stores, audit logs, passwords
//! └── application/  # AccessControlEngine + pure clearance gate
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use adapters::{
    load_deepwell, seed_store, Credential, DeepwellSeed, FsTextStore, InMemoryRecordStore,
    InMemoryTextStore, JsonLinesAuditLog, MemoryAuditLog, PasswordAuthenticator, RECORDS_FILE,
};
pub use application::{clearance_gate, AccessControlEngine, Gate};
pub use domain::{
    AccessError, AuditLogEntry, AuthError, ClearanceLevel, FileType, Mtf, Record, Scp, Site,
    StoreError, User, ACTION_AUTHENTICATION, ACTION_FILE_ACCESS, ACTION_SESSION, EXPUNGED,
};
pub use ports::{
    AccessApi, AuditSink, AuthField, AuthOutcome, Authenticator, CredentialStore, RecordStore,
    TextStore,
};
