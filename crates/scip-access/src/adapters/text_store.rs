//! Text blob stores.
//!
//! Layout on disk: `<root>/<type>s/<id>/<blob>.md`, with blob directories
//! (SCP addenda) as sub-directories whose files are read whole.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{FileType, StoreError, EXPUNGED};
use crate::ports::TextStore;

/// Blob names are single path components.
fn check_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(StoreError::InvalidPath(name.to_string()));
    }
    Ok(())
}

/// Filesystem-backed store rooted at the deepwell directory.
#[derive(Debug, Clone)]
pub struct FsTextStore {
    root: PathBuf,
}

impl FsTextStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_dir(&self, file_type: FileType, id: i64) -> PathBuf {
        self.root.join(file_type.dir_name()).join(id.to_string())
    }
}

#[async_trait]
impl TextStore for FsTextStore {
    async fn read(&self, file_type: FileType, id: i64, blob: &str) -> Result<String, StoreError> {
        check_name(blob)?;
        let path = self.record_dir(file_type, id).join(format!("{blob}.md"));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Blob missing, expunged");
                Ok(EXPUNGED.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_dir(
        &self,
        file_type: FileType,
        id: i64,
        dir: &str,
    ) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        check_name(dir)?;
        let path = self.record_dir(file_type, id).join(dir);
        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut blobs = BTreeMap::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let text = tokio::fs::read_to_string(entry.path()).await?;
            blobs.insert(name, text);
        }
        Ok(Some(blobs))
    }
}

/// Map-backed store for tests and embedding.
///
/// Blobs are keyed by relative path: `desc`, or `addenda/<file>` for
/// directory members.
#[derive(Debug, Default)]
pub struct InMemoryTextStore {
    blobs: RwLock<HashMap<(FileType, i64), BTreeMap<String, String>>>,
}

impl InMemoryTextStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file_type: FileType, id: i64, path: &str, text: impl Into<String>) {
        self.blobs
            .write()
            .entry((file_type, id))
            .or_default()
            .insert(path.to_string(), text.into());
    }
}

#[async_trait]
impl TextStore for InMemoryTextStore {
    async fn read(&self, file_type: FileType, id: i64, blob: &str) -> Result<String, StoreError> {
        check_name(blob)?;
        Ok(self
            .blobs
            .read()
            .get(&(file_type, id))
            .and_then(|blobs| blobs.get(blob))
            .cloned()
            .unwrap_or_else(|| EXPUNGED.to_string()))
    }

    async fn read_dir(
        &self,
        file_type: FileType,
        id: i64,
        dir: &str,
    ) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        check_name(dir)?;
        let prefix = format!("{dir}/");
        let guard = self.blobs.read();
        let members: BTreeMap<String, String> = guard
            .get(&(file_type, id))
            .into_iter()
            .flatten()
            .filter_map(|(path, text)| {
                path.strip_prefix(&prefix)
                    .map(|name| (name.to_string(), text.clone()))
            })
            .collect();
        Ok((!members.is_empty()).then_some(members))
    }
}
