//! The per-type synchronizer contract.

use crate::artifact::ArtifactRecord;
use crate::error::CoreResult;
use crate::store::MetadataStore;
use crate::types::{ArtifactId, Lifecycle, Phase};
use artisync_source::extension_of;

/// Plugs one artifact type into the generic reconciliation loop.
///
/// A synchronizer recognizes its locations, parses their bytes into records,
/// owns their persisted state and performs their side effects. The driver
/// only ever sees `dyn Synchronizer`.
///
/// # Invariants
///
/// - `parse` is pure: malformed input is an error and nothing is persisted
/// - `upsert` is idempotent and preserves the durable [`ArtifactId`]
/// - `apply` returns `Ok(false)` for a phase that does not fit the record;
///   errors mean a real failure
/// - Implementations must be `Send + Sync` so families can run on worker
///   threads
pub trait Synchronizer: Send + Sync {
    /// Artifact type owned by this synchronizer (e.g. `role`).
    fn artifact_type(&self) -> &str;

    /// Identifier used in logs and diagnostics. Defaults to the type.
    fn id(&self) -> &str {
        self.artifact_type()
    }

    /// Returns true if this synchronizer handles `location`.
    fn accepts(&self, location: &str) -> bool;

    /// Parses the bytes at `location` into records.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`](crate::CoreError::Parse) for malformed
    /// content.
    fn parse(&self, location: &str, content: &[u8]) -> CoreResult<Vec<ArtifactRecord>>;

    /// Metadata store holding this type's records.
    fn store(&self) -> &dyn MetadataStore;

    /// Performs the side effect of `phase` for `record`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Apply`](crate::CoreError::Apply) if the side effect
    /// failed.
    fn apply(&self, record: &ArtifactRecord, phase: Phase) -> CoreResult<bool>;

    /// Loads the persisted copy of `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    fn find_persisted(&self, record: &ArtifactRecord) -> CoreResult<Option<ArtifactRecord>> {
        self.store().find_by_key(&record.key())
    }

    /// Inserts or overwrites the persisted copy of `record`.
    ///
    /// An existing durable identity is kept; a first insert assigns one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn upsert(&self, record: &mut ArtifactRecord) -> CoreResult<()> {
        let existing = self.store().find_by_key(&record.key())?;
        record.id = existing
            .and_then(|e| e.id)
            .or(record.id)
            .or_else(|| Some(ArtifactId::new()));
        self.store().save(record)
    }

    /// Persists a lifecycle outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid or the write fails.
    fn set_status(
        &self,
        record: &mut ArtifactRecord,
        lifecycle: Lifecycle,
        error: Option<String>,
    ) -> CoreResult<()> {
        match lifecycle {
            Lifecycle::Created => record.mark_applied(Phase::Create)?,
            Lifecycle::Updated => record.mark_applied(Phase::Update)?,
            Lifecycle::Failed => record.mark_failed(error.unwrap_or_default())?,
            other => {
                record.transition_to(other)?;
                record.last_error = error;
            }
        }
        self.store().save(record)
    }

    /// Removes the persisted state of an orphan.
    ///
    /// Implementations that hold derived state beyond the store override this
    /// and call [`MetadataStore::delete`] themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    fn cleanup(&self, record: &ArtifactRecord) -> CoreResult<()> {
        self.store().delete(&record.key())?;
        Ok(())
    }

    /// Lists every persisted record of this type.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_persisted(&self) -> CoreResult<Vec<ArtifactRecord>> {
        self.store().find_all(self.artifact_type())
    }
}

/// Returns true if `location` ends in `.{extension}`.
#[must_use]
pub fn accepts_extension(location: &str, extension: &str) -> bool {
    extension_of(location) == Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::InMemoryStore;

    struct JobSynchronizer {
        store: InMemoryStore,
    }

    impl Synchronizer for JobSynchronizer {
        fn artifact_type(&self) -> &str {
            "job"
        }

        fn accepts(&self, location: &str) -> bool {
            accepts_extension(location, "job")
        }

        fn parse(&self, location: &str, content: &[u8]) -> CoreResult<Vec<ArtifactRecord>> {
            let name = std::str::from_utf8(content).map_err(|e| CoreError::parse(location, e))?;
            Ok(vec![ArtifactRecord::new("job", location, name.trim(), content)])
        }

        fn store(&self) -> &dyn MetadataStore {
            &self.store
        }

        fn apply(&self, record: &ArtifactRecord, phase: Phase) -> CoreResult<bool> {
            Ok(phase.fits(record.lifecycle))
        }
    }

    fn sync() -> JobSynchronizer {
        JobSynchronizer {
            store: InMemoryStore::new(),
        }
    }

    #[test]
    fn accepts_by_extension() {
        let s = sync();
        assert!(s.accepts("/jobs/nightly.job"));
        assert!(!s.accepts("/jobs/nightly.job.bak"));
        assert_eq!(s.id(), "job");
    }

    #[test]
    fn upsert_preserves_identity() {
        let s = sync();
        let mut first = s.parse("/a.job", b"nightly").unwrap().remove(0);
        s.upsert(&mut first).unwrap();
        let id = first.id.unwrap();

        let mut second = s.parse("/a.job", b"nightly ").unwrap().remove(0);
        assert!(second.id.is_none());
        s.upsert(&mut second).unwrap();
        assert_eq!(second.id, Some(id));

        s.upsert(&mut second).unwrap();
        assert_eq!(s.list_persisted().unwrap().len(), 1);
        assert_eq!(s.find_persisted(&second).unwrap().unwrap().content_hash, second.content_hash);
    }

    #[test]
    fn set_status_and_cleanup() {
        let s = sync();
        let mut r = s.parse("/a.job", b"nightly").unwrap().remove(0);
        s.upsert(&mut r).unwrap();
        s.set_status(&mut r, Lifecycle::Created, None).unwrap();

        let persisted = s.find_persisted(&r).unwrap().unwrap();
        assert_eq!(persisted.lifecycle, Lifecycle::Created);
        assert_eq!(persisted.applied_hash, Some(r.content_hash));

        assert!(s.set_status(&mut r, Lifecycle::New, None).is_err());

        s.cleanup(&r).unwrap();
        assert!(s.list_persisted().unwrap().is_empty());
    }

    #[test]
    fn set_status_records_failure_and_recovery() {
        let s = sync();
        let mut r = s.parse("/a.job", b"nightly").unwrap().remove(0);
        s.upsert(&mut r).unwrap();
        s.set_status(&mut r, Lifecycle::Failed, Some("queue offline".into()))
            .unwrap();

        let persisted = s.find_persisted(&r).unwrap().unwrap();
        assert_eq!(persisted.lifecycle, Lifecycle::Failed);
        assert_eq!(persisted.last_error.as_deref(), Some("queue offline"));
        assert!(persisted.applied_hash.is_none());

        r.transition_to(Lifecycle::New).unwrap();
        s.set_status(&mut r, Lifecycle::Created, None).unwrap();
        let persisted = s.find_persisted(&r).unwrap().unwrap();
        assert_eq!(persisted.lifecycle, Lifecycle::Created);
        assert!(persisted.last_error.is_none());
        assert_eq!(persisted.applied_hash, Some(r.content_hash));
    }

    #[test]
    fn parse_error_is_structured() {
        let s = sync();
        let err = s.parse("/bad.job", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, CoreError::Parse { ref location, .. } if location == "/bad.job"));
    }
}
