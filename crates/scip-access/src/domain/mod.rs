//! Domain layer: clearance model, records, audit entries, errors.

pub mod audit;
pub mod clearance;
pub mod errors;
pub mod records;

pub use audit::{AuditLogEntry, ACTION_AUTHENTICATION, ACTION_FILE_ACCESS, ACTION_SESSION};
pub use clearance::ClearanceLevel;
pub use errors::{AccessError, AuthError, StoreError};
pub use records::{FileType, Mtf, Record, Scp, Site, User};

/// Stand-in text for any blob that does not exist.
pub const EXPUNGED: &str = "[DATA EXPUNGED]";
