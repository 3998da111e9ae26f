//! In-memory record store.
//!
//! Records are kept in an [`Arena`]: one map per record kind, keyed by id,
//! with foreign keys stored as plain ids. Writers go through
//! [`InMemoryRecordStore::transaction`], which works on a copy of the
//! arena and only swaps it in when the closure succeeds. A failing closure
//! leaves the store exactly as it was.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::{FileType, Mtf, Record, Scp, Site, StoreError, User};
use crate::ports::{CredentialStore, RecordStore};

/// Entity arena.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    users: HashMap<i64, User>,
    scps: HashMap<i64, Scp>,
    mtfs: HashMap<i64, Mtf>,
    sites: HashMap<i64, Site>,
    credentials: HashMap<i64, String>,
}

impl Arena {
    /// Insert a new record. Ids are unique per kind.
    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        let file_type = record.file_type();
        let id = record.id();
        if id <= 0 {
            return Err(StoreError::Parse(format!(
                "{file_type} id must be positive, got {id}"
            )));
        }
        if self.contains(file_type, id) {
            return Err(StoreError::Duplicate { file_type, id });
        }
        match record {
            Record::Scp(r) => {
                self.scps.insert(id, r);
            }
            Record::Mtf(r) => {
                self.mtfs.insert(id, r);
            }
            Record::Site(r) => {
                self.sites.insert(id, r);
            }
            Record::User(r) => {
                self.users.insert(id, r);
            }
        }
        Ok(())
    }

    /// Attach a credential to an existing user.
    pub fn set_credential(&mut self, user_id: i64, encoded: String) -> Result<(), StoreError> {
        if !self.users.contains_key(&user_id) {
            return Err(StoreError::DanglingReference {
                from: FileType::User,
                from_id: user_id,
                to: FileType::User,
                to_id: user_id,
            });
        }
        self.credentials.insert(user_id, encoded);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, file_type: FileType, id: i64) -> Option<Record> {
        match file_type {
            FileType::Scp => self.scps.get(&id).cloned().map(Record::Scp),
            FileType::Mtf => self.mtfs.get(&id).cloned().map(Record::Mtf),
            FileType::Site => self.sites.get(&id).cloned().map(Record::Site),
            FileType::User => self.users.get(&id).cloned().map(Record::User),
        }
    }

    #[must_use]
    pub fn contains(&self, file_type: FileType, id: i64) -> bool {
        match file_type {
            FileType::Scp => self.scps.contains_key(&id),
            FileType::Mtf => self.mtfs.contains_key(&id),
            FileType::Site => self.sites.contains_key(&id),
            FileType::User => self.users.contains_key(&id),
        }
    }

    /// Number of records of one kind.
    #[must_use]
    pub fn count(&self, file_type: FileType) -> usize {
        match file_type {
            FileType::Scp => self.scps.len(),
            FileType::Mtf => self.mtfs.len(),
            FileType::Site => self.sites.len(),
            FileType::User => self.users.len(),
        }
    }

    /// Verify every foreign key resolves.
    pub fn check_links(&self) -> Result<(), StoreError> {
        let mut links: Vec<(FileType, i64, FileType, i64)> = Vec::new();

        for user in self.users.values() {
            links.push((FileType::User, user.id, FileType::Site, user.site_id));
            if let Some(mtf) = user.mtf_id {
                links.push((FileType::User, user.id, FileType::Mtf, mtf));
            }
        }
        for scp in self.scps.values() {
            if let Some(site) = scp.site_id {
                links.push((FileType::Scp, scp.id, FileType::Site, site));
            }
            if let Some(mtf) = scp.mtf_id {
                links.push((FileType::Scp, scp.id, FileType::Mtf, mtf));
            }
        }
        for mtf in self.mtfs.values() {
            if let Some(leader) = mtf.leader_id {
                links.push((FileType::Mtf, mtf.id, FileType::User, leader));
            }
            if let Some(site) = mtf.site_id {
                links.push((FileType::Mtf, mtf.id, FileType::Site, site));
            }
        }
        for site in self.sites.values() {
            if let Some(director) = site.director_id {
                links.push((FileType::Site, site.id, FileType::User, director));
            }
        }

        // Report the lowest offender first so errors are stable.
        links.sort_unstable();
        match links
            .into_iter()
            .find(|(_, _, to, to_id)| !self.contains(*to, *to_id))
        {
            Some((from, from_id, to, to_id)) => Err(StoreError::DanglingReference {
                from,
                from_id,
                to,
                to_id,
            }),
            None => Ok(()),
        }
    }
}

/// Shared in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    arena: RwLock<Arena>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a working copy and commit it only on `Ok`.
    ///
    /// Transactions are serialized by the write lock.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Arena) -> Result<T, StoreError>,
    {
        let mut guard = self.arena.write();
        let mut working = guard.clone();
        match f(&mut working) {
            Ok(value) => {
                *guard = working;
                debug!("Record store transaction committed");
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, "Record store transaction rolled back");
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn count(&self, file_type: FileType) -> usize {
        self.arena.read().count(file_type)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, file_type: FileType, id: i64) -> Result<Option<Record>, StoreError> {
        Ok(self.arena.read().get(file_type, id))
    }
}

#[async_trait]
impl CredentialStore for InMemoryRecordStore {
    async fn credential(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        Ok(self.arena.read().credentials.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClearanceLevel;

    fn site(id: i64) -> Record {
        Record::Site(Site {
            id,
            name: format!("Site-{id:02}"),
            director_id: None,
        })
    }

    fn user(id: i64, site_id: i64) -> Record {
        Record::User(User {
            id,
            name: format!("Agent {id}"),
            title: "Researcher".into(),
            clearance: ClearanceLevel::MIN,
            site_id,
            mtf_id: None,
            is_active: true,
            last_login: None,
        })
    }

    #[tokio::test]
    async fn test_get_returns_fresh_copy() {
        let store = InMemoryRecordStore::new();
        store.transaction(|a| a.insert(site(19))).unwrap();

        let first = store.get(FileType::Site, 19).await.unwrap().unwrap();
        assert_eq!(first.name(), "Site-19");
        assert!(store.get(FileType::Site, 20).await.unwrap().is_none());
        assert!(store.get(FileType::Scp, 19).await.unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut arena = Arena::default();
        arena.insert(site(19)).unwrap();
        assert!(matches!(
            arena.insert(site(19)),
            Err(StoreError::Duplicate { file_type: FileType::Site, id: 19 })
        ));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = InMemoryRecordStore::new();
        store.transaction(|a| a.insert(site(19))).unwrap();

        let result = store.transaction(|a| {
            a.insert(site(17))?;
            a.insert(site(19))
        });

        assert!(result.is_err());
        assert_eq!(store.count(FileType::Site), 1);
    }

    #[test]
    fn test_dangling_site_link_detected() {
        let mut arena = Arena::default();
        arena.insert(user(5, 81)).unwrap();
        assert!(matches!(
            arena.check_links(),
            Err(StoreError::DanglingReference {
                from: FileType::User,
                from_id: 5,
                to: FileType::Site,
                to_id: 81
            })
        ));
        arena.insert(site(81)).unwrap();
        arena.check_links().unwrap();
    }

    #[tokio::test]
    async fn test_credentials_need_existing_user() {
        let store = InMemoryRecordStore::new();
        assert!(store
            .transaction(|a| a.set_credential(5, "sha256$00$00".into()))
            .is_err());

        store
            .transaction(|a| {
                a.insert(site(19))?;
                a.insert(user(5, 19))?;
                a.set_credential(5, "sha256$00$00".into())
            })
            .unwrap();
        assert_eq!(
            store.credential(5).await.unwrap().as_deref(),
            Some("sha256$00$00")
        );
        assert_eq!(store.get_user(5).await.unwrap().unwrap().id, 5);
    }
}
