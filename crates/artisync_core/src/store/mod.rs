//! Metadata store boundary.
//!
//! The store is the durable source of truth between passes. Writes are
//! per-record; there are no multi-record transactions.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::InMemoryStore;

use crate::artifact::ArtifactRecord;
use crate::error::CoreResult;

/// Persistence for artifact records, keyed by [`ArtifactRecord::key`].
///
/// # Implementors
///
/// - [`InMemoryStore`] - For testing and ephemeral registries
/// - [`FileStore`] - CBOR snapshot on disk
pub trait MetadataStore: Send + Sync {
    /// Looks up a record by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_by_key(&self, key: &str) -> CoreResult<Option<ArtifactRecord>>;

    /// Inserts or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save(&self, record: &ArtifactRecord) -> CoreResult<()>;

    /// Deletes a record. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, key: &str) -> CoreResult<bool>;

    /// Returns every record of `artifact_type`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_all(&self, artifact_type: &str) -> CoreResult<Vec<ArtifactRecord>>;
}
