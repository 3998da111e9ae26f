//! # Access Control Engine
//!
//! Maps `(file type, file id, user, ip)` to exactly one of four terminal
//! outcomes:
//!
//! ```text
//! REQUESTED ─┬─ unknown type ──────────────► ACCESS_TYPE_FAIL
//!            ├─ no such record ────────────► ACCESS_EXPUNGED
//!            ├─ clearance gate fails ──────► ACCESS_REDACTED
//!            └─ gate passes ───────────────► ACCESS_GRANTED
//! ```
//!
//! Every outcome is appended to the audit trail. "Does not exist" and
//! "exists but forbidden" stay distinct.
//!
//! Entries are written when the decision is made, before the caller sends
//! the reply. An "Accessed ..." entry records that the grant was issued, not
//! that the peer received it; a reply that fails to go out is audited
//! separately by the session as a `Session` entry.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use scip_protocol::{builders, Message};
use tracing::{info, instrument};

use crate::domain::{AccessError, AuditLogEntry, ClearanceLevel, FileType, Record, User, EXPUNGED};
use crate::ports::{AccessApi, AuditSink, RecordStore, TextStore};

/// Result of the clearance check on an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Pass,
    /// Denied; `needed` is the level reported back to the requester.
    Redact { needed: ClearanceLevel },
}

/// Pure clearance policy.
///
/// - SCP and USER records need `user.clearance >= record.clearance`.
/// - SITE records open to staff assigned there or to level 3 and above.
/// - MTF records are open to any authenticated user.
#[must_use]
pub fn clearance_gate(user: &User, record: &Record) -> Gate {
    let by_level = |needed: ClearanceLevel| {
        if user.clearance >= needed {
            Gate::Pass
        } else {
            Gate::Redact { needed }
        }
    };

    match record {
        Record::Scp(scp) => by_level(scp.clearance),
        Record::User(other) => by_level(other.clearance),
        Record::Site(site) if user.site_id == site.id => Gate::Pass,
        Record::Site(_) => by_level(ClearanceLevel::SITE_OVERRIDE),
        Record::Mtf(_) => Gate::Pass,
    }
}

/// The engine, wired to its collaborators.
pub struct AccessControlEngine {
    records: Arc<dyn RecordStore>,
    texts: Arc<dyn TextStore>,
    audit: Arc<dyn AuditSink>,
}

impl AccessControlEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        texts: Arc<dyn TextStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            records,
            texts,
            audit,
        }
    }

    async fn log(&self, user: &User, ip: IpAddr, details: String, success: bool) -> Result<(), AccessError> {
        self.audit
            .append(AuditLogEntry::file_access(user.id, ip, details, success))
            .await?;
        Ok(())
    }

    /// Text blobs for a granted record. Missing blobs become the expunged
    /// placeholder; directory members are keyed `<dir>/<file>`.
    async fn gather(&self, file_type: FileType, id: i64) -> Result<BTreeMap<String, String>, AccessError> {
        let mut files = BTreeMap::new();
        for blob in file_type.blob_names() {
            let text = self.texts.read(file_type, id, blob).await?;
            files.insert((*blob).to_string(), text);
        }
        for dir in file_type.blob_dirs() {
            match self.texts.read_dir(file_type, id, dir).await? {
                Some(members) => {
                    for (name, text) in members {
                        files.insert(format!("{dir}/{name}"), text);
                    }
                }
                None => {
                    files.insert((*dir).to_string(), EXPUNGED.to_string());
                }
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl AccessApi for AccessControlEngine {
    #[instrument(skip(self, user, ip), fields(user_id = user.id, %ip))]
    async fn access(
        &self,
        f_type: &str,
        f_id: i64,
        user: &User,
        ip: IpAddr,
    ) -> Result<Message, AccessError> {
        let Ok(file_type) = f_type.parse::<FileType>() else {
            self.log(user, ip, format!("Attempted access to invalid file type: {f_type}"), false)
                .await?;
            info!(outcome = "type_fail", "Access decided");
            return Ok(builders::access_type_fail(f_type, FileType::valid_names().as_slice())?);
        };

        let record = if f_id > 0 {
            self.records.get(file_type, f_id).await?
        } else {
            None
        };
        let Some(record) = record else {
            self.log(user, ip, format!("Attempted access to non-existent {file_type} ID {f_id}"), false)
                .await?;
            info!(outcome = "expunged", "Access decided");
            return Ok(builders::access_expunged(file_type.as_str(), f_id)?);
        };

        if let Gate::Redact { needed } = clearance_gate(user, &record) {
            self.log(
                user,
                ip,
                format!("Attempted access to {file_type} ID {f_id} with insufficient clearance"),
                false,
            )
            .await?;
            info!(outcome = "redacted", needed = needed.get(), "Access decided");
            return Ok(builders::access_redacted(
                user.clearance.name(),
                user.clearance.colour(),
                needed.name(),
                needed.colour(),
            )?);
        }

        let files = self.gather(file_type, record.id()).await?;
        let granted = builders::access_granted(file_type.as_str(), &record, files)?;
        // Issued, not yet delivered.
        self.log(user, ip, format!("Accessed {file_type} {}", record.id()), true)
            .await?;
        info!(outcome = "granted", "Access decided");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mtf, Scp, Site};

    fn user(clearance: u8, site_id: i64) -> User {
        User {
            id: 1,
            name: "Test".into(),
            title: "Researcher".into(),
            clearance: ClearanceLevel::new(clearance).unwrap(),
            site_id,
            mtf_id: None,
            is_active: true,
            last_login: None,
        }
    }

    fn scp(clearance: u8) -> Record {
        Record::Scp(Scp {
            id: 999,
            name: "The Tickle Monster".into(),
            clearance: ClearanceLevel::new(clearance).unwrap(),
            containment_class: "Safe".into(),
            secondary_class: None,
            disruption_class: None,
            risk_class: None,
            site_id: None,
            mtf_id: None,
        })
    }

    #[test]
    fn test_scp_gate() {
        assert_eq!(clearance_gate(&user(4, 1), &scp(4)), Gate::Pass);
        assert_eq!(
            clearance_gate(&user(2, 1), &scp(4)),
            Gate::Redact {
                needed: ClearanceLevel::new(4).unwrap()
            }
        );
    }

    #[test]
    fn test_site_gate_membership_or_level_three() {
        let site = Record::Site(Site {
            id: 19,
            name: "Site-19".into(),
            director_id: None,
        });
        assert_eq!(clearance_gate(&user(1, 19), &site), Gate::Pass);
        assert_eq!(clearance_gate(&user(3, 17), &site), Gate::Pass);
        assert_eq!(
            clearance_gate(&user(2, 17), &site),
            Gate::Redact {
                needed: ClearanceLevel::SITE_OVERRIDE
            }
        );
    }

    #[test]
    fn test_mtf_is_ungated() {
        let mtf = Record::Mtf(Mtf {
            id: 1,
            name: "Epsilon-11".into(),
            nickname: "Nine-Tailed Fox".into(),
            leader_id: None,
            site_id: None,
            active: true,
        });
        assert_eq!(clearance_gate(&user(1, 0), &mtf), Gate::Pass);
    }
}
