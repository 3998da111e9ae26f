//! Ports: inbound APIs and outbound collaborator traits.

pub mod inbound;
pub mod outbound;

pub use inbound::{AccessApi, AuthField, AuthOutcome, Authenticator};
pub use outbound::{AuditSink, CredentialStore, RecordStore, TextStore};
