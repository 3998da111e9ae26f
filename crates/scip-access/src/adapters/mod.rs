//! Adapters: in-process implementations of the outbound ports and the
//! password authenticator.

pub mod audit_log;
pub mod deepwell;
pub mod memory_store;
pub mod password;
pub mod text_store;

pub use audit_log::{JsonLinesAuditLog, MemoryAuditLog};
pub use deepwell::{load_deepwell, seed_store, DeepwellSeed, SeedSummary, UserSeed, RECORDS_FILE};
pub use memory_store::{Arena, InMemoryRecordStore};
pub use password::{Credential, PasswordAuthenticator};
pub use text_store::{FsTextStore, InMemoryTextStore};
