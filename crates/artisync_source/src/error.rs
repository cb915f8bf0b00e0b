//! Error types for content source operations.

use std::io;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while reading artifact definitions from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested location does not exist in the source.
    #[error("location not found: {0}")]
    NotFound(String),

    /// The location is malformed or escapes the source root.
    #[error("invalid location '{location}': {reason}")]
    InvalidLocation {
        /// The offending location.
        location: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl SourceError {
    /// Creates an invalid location error.
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
