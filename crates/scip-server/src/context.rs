//! # Application Context
//!
//! Everything a session needs, built once at startup and shared by
//! reference. Sessions see only the inbound ports, so tests can swap in
//! in-memory collaborators.

use std::sync::Arc;

use scip_access::{
    load_deepwell, AccessApi, AccessControlEngine, AuditSink, Authenticator, FsTextStore,
    InMemoryRecordStore, JsonLinesAuditLog, PasswordAuthenticator, StoreError, TextStore,
};
use tracing::info;

use crate::config::StorageConfig;

/// Shared collaborators for every session.
#[derive(Clone)]
pub struct AppContext {
    pub authenticator: Arc<dyn Authenticator>,
    pub access: Arc<dyn AccessApi>,
    /// Receives session-level failures after authentication.
    pub audit: Arc<dyn AuditSink>,
}

impl AppContext {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        access: Arc<dyn AccessApi>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            authenticator,
            access,
            audit,
        }
    }

    /// Wire the password authenticator and access engine over one record
    /// store, one text store and one audit sink.
    pub fn assemble(
        records: Arc<InMemoryRecordStore>,
        texts: Arc<dyn TextStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let authenticator = PasswordAuthenticator::new(records.clone(), records.clone(), audit.clone());
        let engine = AccessControlEngine::new(records, texts, audit.clone());
        Self::new(Arc::new(authenticator), Arc::new(engine), audit)
    }

    /// Load the deepwell and open the audit log named by `storage`.
    pub async fn build(storage: &StorageConfig) -> Result<Self, StoreError> {
        let records = Arc::new(load_deepwell(&storage.deepwell_dir).await?);
        let texts = Arc::new(FsTextStore::new(storage.deepwell_dir.clone()));
        let audit = Arc::new(JsonLinesAuditLog::open(storage.audit_log_path()).await?);

        info!(
            deepwell = %storage.deepwell_dir.display(),
            audit_log = %audit.path().display(),
            "Application context ready"
        );

        Ok(Self::assemble(records, texts, audit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scip_access::{AuthOutcome, Credential, RECORDS_FILE};
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_build_from_deepwell_dir() {
        let dir = tempfile::tempdir().unwrap();
        let credential = Credential::with_salt("right", b"pepper").encode();
        let seed = serde_json::json!({
            "sites": [{"id": 19, "name": "Site-19"}],
            "users": [{"id": 5, "name": "Jack Bright", "title": "Researcher",
                       "clearance": 4, "site_id": 19, "password": credential}],
            "mtfs": [],
            "scps": []
        });
        tokio::fs::write(dir.path().join(RECORDS_FILE), seed.to_string())
            .await
            .unwrap();

        let storage = StorageConfig {
            deepwell_dir: dir.path().to_path_buf(),
            audit_log: None,
        };
        let ctx = AppContext::build(&storage).await.unwrap();

        let outcome = ctx
            .authenticator
            .authenticate(5, "right", IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::Accepted(user) if user.id == 5));
        assert!(dir.path().join("audit.log").exists());
    }

    #[tokio::test]
    async fn test_build_fails_without_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            deepwell_dir: dir.path().join("missing"),
            audit_log: None,
        };
        assert!(AppContext::build(&storage).await.is_err());
    }
}
