//! Content source trait definition.

use crate::error::{SourceError, SourceResult};

/// One physical source unit: a location and the raw bytes stored there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Normalized location (`/`-separated, leading `/`).
    pub location: String,
    /// Raw content.
    pub content: Vec<u8>,
}

impl SourceEntry {
    /// Creates a new entry.
    pub fn new(location: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            location: location.into(),
            content,
        }
    }
}

/// A content source holding artifact definitions.
///
/// Sources are **opaque byte stores**. They list what they hold, answer
/// existence checks and return raw bytes. Parsing is the job of the
/// synchronizer that accepts a location.
///
/// # Invariants
///
/// - `list_candidates` returns every location accepted by `filter` exactly once
/// - entries are returned sorted by location so passes are deterministic
/// - `exists(l)` is true iff `read(l)` succeeds
/// - Sources must be `Send + Sync` for concurrent families
///
/// # Implementors
///
/// - [`super::InMemorySource`] - For testing
/// - [`super::FileSystemSource`] - For a registry folder on disk
/// - [`super::LayeredSource`] - Predelivered plus live content
pub trait ContentSource: Send + Sync {
    /// Lists every entry whose location is accepted by `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated. Callers treat this
    /// as fatal for the current pass.
    fn list_candidates(&self, filter: &dyn Fn(&str) -> bool) -> SourceResult<Vec<SourceEntry>>;

    /// Returns true if the location currently exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself fails (e.g. permission denied).
    fn exists(&self, location: &str) -> SourceResult<bool>;

    /// Reads the raw bytes stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if nothing is stored there.
    fn read(&self, location: &str) -> SourceResult<Vec<u8>>;
}

/// Normalizes a location to the canonical `/a/b/c.ext` form.
///
/// Backslashes become slashes, empty and `.` segments are dropped.
///
/// # Errors
///
/// Returns [`SourceError::InvalidLocation`] for empty locations and for any
/// `..` segment.
pub fn normalize_location(location: &str) -> SourceResult<String> {
    let replaced = location.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(SourceError::invalid_location(
                    location,
                    "parent segments are not allowed",
                ))
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Err(SourceError::invalid_location(location, "empty location"));
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Returns the file extension of a location, without the dot.
#[must_use]
pub fn extension_of(location: &str) -> Option<&str> {
    let file_name = location.rsplit('/').next()?;
    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(&file_name[dot + 1..])
}
