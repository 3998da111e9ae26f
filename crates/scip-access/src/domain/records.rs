//! # Deepwell Records
//!
//! Entities are plain values keyed by id. Cross references (a user's site,
//! an SCP's task force, a site's director) are stored as ids and resolved
//! with fresh lookups, never as live references.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clearance::ClearanceLevel;

/// The four requestable record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Scp,
    Mtf,
    Site,
    User,
}

impl FileType {
    pub const ALL: [FileType; 4] = [FileType::Scp, FileType::Mtf, FileType::Site, FileType::User];

    /// Name as it appears in `access_request.f_type`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Scp => "SCP",
            FileType::Mtf => "MTF",
            FileType::Site => "SITE",
            FileType::User => "USER",
        }
    }

    /// Directory holding this type's text blobs (`scps`, `mtfs`, ...).
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            FileType::Scp => "scps",
            FileType::Mtf => "mtfs",
            FileType::Site => "sites",
            FileType::User => "users",
        }
    }

    /// Single-file blobs gathered on a granted request.
    #[must_use]
    pub fn blob_names(self) -> &'static [&'static str] {
        match self {
            FileType::Scp => &["desc", "cps"],
            FileType::Mtf => &["mission"],
            FileType::Site => &["loc", "desc", "dossier"],
            FileType::User => &[],
        }
    }

    /// Blob directories flattened into the files map.
    #[must_use]
    pub fn blob_dirs(self) -> &'static [&'static str] {
        match self {
            FileType::Scp => &["addenda"],
            _ => &[],
        }
    }

    #[must_use]
    pub fn valid_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on the wire name.
impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Foundation personnel.
///
/// Credentials live in the credential store, never on this type, so a
/// serialized `User` is safe to send to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub clearance: ClearanceLevel,
    pub site_id: i64,
    #[serde(default)]
    pub mtf_id: Option<i64>,
    /// Informational only. Does not gate authentication.
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scp {
    pub id: i64,
    pub name: String,
    pub clearance: ClearanceLevel,
    pub containment_class: String,
    #[serde(default)]
    pub secondary_class: Option<String>,
    #[serde(default)]
    pub disruption_class: Option<String>,
    #[serde(default)]
    pub risk_class: Option<String>,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub mtf_id: Option<i64>,
}

/// Mobile Task Force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mtf {
    pub id: i64,
    pub name: String,
    pub nickname: String,
    #[serde(default)]
    pub leader_id: Option<i64>,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub director_id: Option<i64>,
}

fn default_true() -> bool {
    true
}

/// Any record that can be requested. Serializes as the bare inner record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Scp(Scp),
    Mtf(Mtf),
    Site(Site),
    User(User),
}

impl Record {
    #[must_use]
    pub fn file_type(&self) -> FileType {
        match self {
            Record::Scp(_) => FileType::Scp,
            Record::Mtf(_) => FileType::Mtf,
            Record::Site(_) => FileType::Site,
            Record::User(_) => FileType::User,
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Record::Scp(r) => r.id,
            Record::Mtf(r) => r.id,
            Record::Site(r) => r.id,
            Record::User(r) => r.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Record::Scp(r) => &r.name,
            Record::Mtf(r) => &r.name,
            Record::Site(r) => &r.name,
            Record::User(r) => &r.name,
        }
    }
}
