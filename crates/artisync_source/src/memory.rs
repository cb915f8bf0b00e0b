//! In-memory content source.

use crate::error::{SourceError, SourceResult};
use crate::source::{normalize_location, ContentSource, SourceEntry};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory content source.
///
/// This source keeps all definitions in memory and is suitable for:
/// - Unit and integration tests
/// - Predelivered definitions compiled into the host binary
/// - Definitions registered programmatically at startup
///
/// # Thread Safety
///
/// This source is thread-safe; content can be changed while other threads
/// run passes against it.
///
/// # Example
///
/// ```rust
/// use artisync_source::{ContentSource, InMemorySource};
///
/// let source = InMemorySource::new();
/// source.put("jobs/nightly.job", b"{}".to_vec()).unwrap();
/// assert_eq!(source.read("/jobs/nightly.job").unwrap(), b"{}");
/// ```
#[derive(Debug, Default)]
pub struct InMemorySource {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemorySource {
    /// Creates a new empty in-memory source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source pre-populated with the given entries.
    ///
    /// # Errors
    ///
    /// Returns an error if any location is invalid.
    pub fn with_entries<I, L>(entries: I) -> SourceResult<Self>
    where
        I: IntoIterator<Item = (L, Vec<u8>)>,
        L: AsRef<str>,
    {
        let source = Self::new();
        for (location, content) in entries {
            source.put(location.as_ref(), content)?;
        }
        Ok(source)
    }

    /// Stores `content` at `location`, replacing anything already there.
    ///
    /// Returns the normalized location.
    ///
    /// # Errors
    ///
    /// Returns an error if the location is invalid.
    pub fn put(&self, location: &str, content: Vec<u8>) -> SourceResult<String> {
        let location = normalize_location(location)?;
        self.entries.write().insert(location.clone(), content);
        Ok(location)
    }

    /// Removes the entry at `location`.
    ///
    /// Returns true if something was removed.
    pub fn remove(&self, location: &str) -> bool {
        match normalize_location(location) {
            Ok(location) => self.entries.write().remove(&location).is_some(),
            Err(_) => false,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the source holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl ContentSource for InMemorySource {
    fn list_candidates(&self, filter: &dyn Fn(&str) -> bool) -> SourceResult<Vec<SourceEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|(location, _)| filter(location))
            .map(|(location, content)| SourceEntry::new(location.clone(), content.clone()))
            .collect())
    }

    fn exists(&self, location: &str) -> SourceResult<bool> {
        let location = normalize_location(location)?;
        Ok(self.entries.read().contains_key(&location))
    }

    fn read(&self, location: &str) -> SourceResult<Vec<u8>> {
        let normalized = normalize_location(location)?;
        self.entries
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(SourceError::NotFound(normalized))
    }
}
