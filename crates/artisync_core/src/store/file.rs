//! File-backed metadata store.

use super::MetadataStore;
use crate::artifact::ArtifactRecord;
use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A metadata store persisted as a CBOR snapshot.
///
/// The whole map is rewritten after each mutation using write-then-rename,
/// so a crash leaves either the old or the new snapshot on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, ArtifactRecord>>,
}

impl FileStore {
    /// Opens the store at `path`, loading an existing snapshot if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or decoded.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let data = fs::read(&path)?;
            if data.is_empty() {
                BTreeMap::new()
            } else {
                ciborium::from_reader(data.as_slice()).map_err(CoreError::codec)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), records = records.len(), "opened metadata store");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records of every type.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn persist(&self, records: &BTreeMap<String, ArtifactRecord>) -> CoreResult<()> {
        let mut data = Vec::new();
        ciborium::into_writer(records, &mut data).map_err(CoreError::codec)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl MetadataStore for FileStore {
    fn find_by_key(&self, key: &str) -> CoreResult<Option<ArtifactRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn save(&self, record: &ArtifactRecord) -> CoreResult<()> {
        let mut records = self.records.write();
        let previous = records.insert(record.key(), record.clone());
        if let Err(e) = self.persist(&records) {
            match previous {
                Some(previous) => records.insert(record.key(), previous),
                None => records.remove(&record.key()),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> CoreResult<bool> {
        let mut records = self.records.write();
        let Some(previous) = records.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&records) {
            records.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn find_all(&self, artifact_type: &str) -> CoreResult<Vec<ArtifactRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| r.artifact_type == artifact_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactId, Phase};
    use tempfile::tempdir;

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("artifacts.cbor");

        let mut role = ArtifactRecord::new("role", "/a.roles", "admin", b"[]")
            .with_attribute("description", "Administrators");
        role.id = Some(ArtifactId::new());
        role.mark_applied(Phase::Create).unwrap();
        {
            let store = FileStore::open(&path).unwrap();
            assert!(store.is_empty());
            store.save(&role).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_key(&role.key()).unwrap(), Some(role.clone()));
        assert!(!path.with_extension("tmp").exists());

        assert!(store.delete(&role.key()).unwrap());
        let store = FileStore::open(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifacts.cbor");
        fs::write(&path, b"\xff\xff not cbor").unwrap();
        assert!(matches!(FileStore::open(&path), Err(CoreError::Codec(_))));
    }

    #[test]
    fn file_store_find_all_filters_type() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("s.cbor")).unwrap();
        store
            .save(&ArtifactRecord::new("role", "/a.roles", "admin", b""))
            .unwrap();
        store
            .save(&ArtifactRecord::new("access", "/a.access", "x", b""))
            .unwrap();
        assert_eq!(store.find_all("access").unwrap().len(), 1);
        assert_eq!(store.path(), dir.path().join("s.cbor"));
    }
}
