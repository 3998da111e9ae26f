//! Salted SHA-256 credentials and the password authenticator.
//!
//! Stored form: `sha256$<salt-hex>$<digest-hex>` where
//! `digest = SHA-256(salt || password)`. Digests are compared in constant
//! time.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::domain::{AuditLogEntry, AuthError};
use crate::ports::{AuditSink, AuthField, AuthOutcome, Authenticator, CredentialStore, RecordStore};

/// Scheme tag of the stored form.
pub const SCHEME: &str = "sha256";

/// Salt length for newly generated credentials.
pub const SALT_LEN: usize = 16;

/// A parsed credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    salt: Vec<u8>,
    digest: [u8; 32],
}

impl Credential {
    /// Hash `password` under a fresh random salt.
    #[must_use]
    pub fn generate(password: &str) -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(password, &salt)
    }

    #[must_use]
    pub fn with_salt(password: &str, salt: &[u8]) -> Self {
        Self {
            salt: salt.to_vec(),
            digest: digest(salt, password),
        }
    }

    /// Parse the stored form. `None` if it is not well formed.
    #[must_use]
    pub fn parse(encoded: &str) -> Option<Self> {
        let mut parts = encoded.split('$');
        let (scheme, salt, digest) = (parts.next()?, parts.next()?, parts.next()?);
        if scheme != SCHEME || parts.next().is_some() {
            return None;
        }
        let salt = hex::decode(salt).ok()?;
        let digest: [u8; 32] = hex::decode(digest).ok()?.try_into().ok()?;
        if salt.is_empty() {
            return None;
        }
        Some(Self { salt, digest })
    }

    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{SCHEME}${}${}",
            hex::encode(&self.salt),
            hex::encode(self.digest)
        )
    }

    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        candidate[..].ct_eq(&self.digest[..]).into()
    }
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Authenticates against the record and credential stores, auditing every
/// decision under the claimed user id.
pub struct PasswordAuthenticator {
    records: Arc<dyn RecordStore>,
    credentials: Arc<dyn CredentialStore>,
    audit: Arc<dyn AuditSink>,
}

impl PasswordAuthenticator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        credentials: Arc<dyn CredentialStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            records,
            credentials,
            audit,
        }
    }

    async fn reject(
        &self,
        user_id: i64,
        ip: IpAddr,
        field: AuthField,
        details: &str,
    ) -> Result<AuthOutcome, AuthError> {
        self.audit
            .append(AuditLogEntry::authentication(user_id, ip, details, false))
            .await?;
        info!(user_id, %ip, field = %field, "Authentication rejected");
        Ok(AuthOutcome::Rejected(field))
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(
        &self,
        user_id: i64,
        password: &str,
        ip: IpAddr,
    ) -> Result<AuthOutcome, AuthError> {
        let malformed = if user_id <= 0 {
            Some(AuthError::InvalidUserId(user_id))
        } else if password.trim().is_empty() {
            Some(AuthError::EmptyPassword)
        } else {
            None
        };
        if let Some(err) = malformed {
            self.audit
                .append(AuditLogEntry::authentication(
                    user_id,
                    ip,
                    format!("Malformed credentials: {err}"),
                    false,
                ))
                .await?;
            return Err(err);
        }

        let Some(user) = self.records.get_user(user_id).await? else {
            return self
                .reject(user_id, ip, AuthField::UserId, "Unknown user id")
                .await;
        };

        let Some(encoded) = self.credentials.credential(user_id).await? else {
            debug!(user_id, "User has no stored credential");
            return self
                .reject(user_id, ip, AuthField::Password, "No credential on file")
                .await;
        };
        let credential = Credential::parse(&encoded).ok_or(AuthError::CorruptCredential(user_id))?;

        if !credential.verify(password) {
            return self
                .reject(user_id, ip, AuthField::Password, "Incorrect password")
                .await;
        }

        self.audit
            .append(AuditLogEntry::authentication(
                user_id,
                ip,
                format!("Authenticated as {} {}", user.title, user.name),
                true,
            ))
            .await?;
        info!(user_id, %ip, clearance = user.clearance.get(), "Authentication succeeded");
        Ok(AuthOutcome::Accepted(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryRecordStore, MemoryAuditLog};
    use crate::domain::{ClearanceLevel, Record, Site, User, ACTION_AUTHENTICATION};
    use std::net::Ipv4Addr;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn fixture() -> (PasswordAuthenticator, Arc<MemoryAuditLog>) {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .transaction(|a| {
                a.insert(Record::Site(Site {
                    id: 19,
                    name: "Site-19".into(),
                    director_id: None,
                }))?;
                a.insert(Record::User(User {
                    id: 5,
                    name: "Jack Bright".into(),
                    title: "Researcher".into(),
                    clearance: ClearanceLevel::new(4)?,
                    site_id: 19,
                    mtf_id: None,
                    is_active: false,
                    last_login: None,
                }))?;
                a.set_credential(5, Credential::generate("right").encode())
            })
            .unwrap();
        let audit = Arc::new(MemoryAuditLog::new());
        let auth = PasswordAuthenticator::new(store.clone(), store, audit.clone());
        (auth, audit)
    }

    #[test]
    fn test_credential_encode_parse() {
        let cred = Credential::with_salt("right", &[0xab; 4]);
        let encoded = cred.encode();
        assert!(encoded.starts_with("sha256$abababab$"));
        assert_eq!(Credential::parse(&encoded), Some(cred.clone()));
        assert!(cred.verify("right"));
        assert!(!cred.verify("wrong"));
    }

    #[test]
    fn test_credential_parse_rejects_bad_forms() {
        assert!(Credential::parse("md5$00$00").is_none());
        assert!(Credential::parse("sha256$zz$00").is_none());
        assert!(Credential::parse("sha256$00$0011").is_none());
        assert!(Credential::parse("sha256$$").is_none());
        assert!(Credential::parse("plaintext").is_none());
    }

    #[test]
    fn test_generated_salts_differ() {
        assert_ne!(Credential::generate("x"), Credential::generate("x"));
    }

    #[tokio::test]
    async fn test_wrong_password_names_password() {
        let (auth, audit) = fixture();
        let outcome = auth.authenticate(5, "wrong", IP).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected(AuthField::Password));

        let entries = audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ACTION_AUTHENTICATION);
        assert!(!entries[0].success);
    }

    #[tokio::test]
    async fn test_unknown_user_names_user_id() {
        let (auth, audit) = fixture();
        let outcome = auth.authenticate(404, "right", IP).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected(AuthField::UserId));
        assert_eq!(audit.entries()[0].user_id, 404);
    }

    #[tokio::test]
    async fn test_inactive_user_still_authenticates() {
        let (auth, audit) = fixture();
        let AuthOutcome::Accepted(user) = auth.authenticate(5, "right", IP).await.unwrap() else {
            panic!("expected acceptance");
        };
        assert_eq!(user.id, 5);
        assert!(!user.is_active);
        assert!(audit.entries()[0].success);
    }

    #[tokio::test]
    async fn test_malformed_input_is_error() {
        let (auth, audit) = fixture();
        let err = auth.authenticate(0, "right", IP).await.unwrap_err();
        assert_eq!(err.field(), "user_id");
        let err = auth.authenticate(5, "   ", IP).await.unwrap_err();
        assert_eq!(err.field(), "password");
        assert_eq!(audit.entries().len(), 2);
    }
}
