//! In-memory metadata store.

use super::MetadataStore;
use crate::artifact::ArtifactRecord;
use crate::error::CoreResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A metadata store that keeps records in memory.
///
/// Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, ArtifactRecord>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Returns a copy of every record.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ArtifactRecord> {
        self.records.read().values().cloned().collect()
    }
}

impl MetadataStore for InMemoryStore {
    fn find_by_key(&self, key: &str) -> CoreResult<Option<ArtifactRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn save(&self, record: &ArtifactRecord) -> CoreResult<()> {
        self.records.write().insert(record.key(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> CoreResult<bool> {
        Ok(self.records.write().remove(key).is_some())
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
