//! Deepwell seed loader.
//!
//! `<deepwell>/records.json` lists sites, users (with encoded credentials),
//! task forces and SCPs. The whole document goes into the record store in
//! one transaction: a duplicate id, a malformed credential or a dangling
//! foreign key rolls back everything.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::memory_store::{Arena, InMemoryRecordStore};
use super::password::Credential;
use crate::domain::{FileType, Mtf, Record, Scp, Site, StoreError, User};

/// File name of the seed document inside the deepwell directory.
pub const RECORDS_FILE: &str = "records.json";

#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    #[serde(flatten)]
    pub user: User,
    /// `sha256$<salt-hex>$<digest-hex>`
    pub password: String,
}

/// Parsed seed document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeepwellSeed {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub users: Vec<UserSeed>,
    #[serde(default)]
    pub mtfs: Vec<Mtf>,
    #[serde(default)]
    pub scps: Vec<Scp>,
}

/// Record counts after a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub sites: usize,
    pub users: usize,
    pub mtfs: usize,
    pub scps: usize,
}

impl DeepwellSeed {
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// Insert everything into `arena` and check links.
    pub fn apply(self, arena: &mut Arena) -> Result<SeedSummary, StoreError> {
        let summary = SeedSummary {
            sites: self.sites.len(),
            users: self.users.len(),
            mtfs: self.mtfs.len(),
            scps: self.scps.len(),
        };

        for site in self.sites {
            arena.insert(Record::Site(site))?;
        }
        for seed in self.users {
            let id = seed.user.id;
            if Credential::parse(&seed.password).is_none() {
                return Err(StoreError::Parse(format!(
                    "{} {id} has a malformed credential",
                    FileType::User
                )));
            }
            arena.insert(Record::User(seed.user))?;
            arena.set_credential(id, seed.password)?;
        }
        for mtf in self.mtfs {
            arena.insert(Record::Mtf(mtf))?;
        }
        for scp in self.scps {
            arena.insert(Record::Scp(scp))?;
        }
        arena.check_links()?;
        Ok(summary)
    }
}

/// Seed `store` inside a single transaction.
pub fn seed_store(store: &InMemoryRecordStore, seed: DeepwellSeed) -> Result<SeedSummary, StoreError> {
    store.transaction(|arena| seed.apply(arena))
}

/// Read `<dir>/records.json` into a fresh store.
pub async fn load_deepwell(dir: impl AsRef<Path>) -> Result<InMemoryRecordStore, StoreError> {
    let path = dir.as_ref().join(RECORDS_FILE);
    let text = tokio::fs::read_to_string(&path).await?;
    let seed = DeepwellSeed::from_json(&text)?;

    let store = InMemoryRecordStore::new();
    let summary = seed_store(&store, seed)?;
    info!(
        path = %path.display(),
        sites = summary.sites,
        users = summary.users,
        mtfs = summary.mtfs,
        scps = summary.scps,
        "Deepwell loaded"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{CredentialStore, RecordStore};

    fn seed_json(director: i64) -> String {
        let cred = Credential::with_salt("right", b"salt").encode();
        format!(
            r#"{{
                "sites": [{{"id": 19, "name": "Site-19", "director_id": {director}}}],
                "users": [{{"id": 5, "name": "Jack Bright", "title": "Researcher",
                            "clearance": 4, "site_id": 19, "password": "{cred}"}}],
                "mtfs": [{{"id": 1, "name": "Epsilon-11", "nickname": "Nine-Tailed Fox", "site_id": 19}}],
                "scps": [{{"id": 173, "name": "The Sculpture", "clearance": 3,
                           "containment_class": "Euclid", "site_id": 19, "mtf_id": 1}}]
            }}"#
        )
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RECORDS_FILE), seed_json(5)).unwrap();

        let store = load_deepwell(dir.path()).await.unwrap();
        let user = store.get_user(5).await.unwrap().unwrap();
        assert_eq!(user.name, "Jack Bright");
        assert_eq!(user.clearance.get(), 4);
        assert!(store.credential(5).await.unwrap().is_some());
        assert!(store.get(FileType::Scp, 173).await.unwrap().is_some());
    }

    #[test]
    fn test_dangling_director_rolls_back_everything() {
        let store = InMemoryRecordStore::new();
        let seed = DeepwellSeed::from_json(&seed_json(99)).unwrap();
        assert!(matches!(
            seed_store(&store, seed),
            Err(StoreError::DanglingReference { to: FileType::User, to_id: 99, .. })
        ));
        assert_eq!(store.count(FileType::Site), 0);
        assert_eq!(store.count(FileType::User), 0);
    }

    #[test]
    fn test_malformed_credential_rejected() {
        let text = r#"{"sites": [{"id": 19, "name": "Site-19"}],
                       "users": [{"id": 5, "name": "x", "title": "y", "clearance": 1,
                                  "site_id": 19, "password": "hunter2"}]}"#;
        let store = InMemoryRecordStore::new();
        let seed = DeepwellSeed::from_json(text).unwrap();
        assert!(matches!(seed_store(&store, seed), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_clearance_is_parse_error() {
        let text = r#"{"scps": [{"id": 1, "name": "x", "clearance": 7, "containment_class": "Safe"}]}"#;
        assert!(matches!(DeepwellSeed::from_json(text), Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_deepwell(dir.path()).await, Err(StoreError::Io(_))));
    }
}
