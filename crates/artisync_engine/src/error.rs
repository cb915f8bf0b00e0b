//! Error types for the reconciliation engine.

use artisync_core::ErrorKind;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a pass or a scheduler operation.
///
/// Per-artifact failures never surface here; they are collected as
/// diagnostics in the [`PassResult`](crate::PassResult).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Another pass of the same family holds the pass lock.
    #[error("a synchronization pass for {family} is already in progress")]
    PassInProgress {
        /// Family name.
        family: String,
    },

    /// The content source could not be enumerated.
    #[error("source error: {0}")]
    Source(#[from] artisync_source::SourceError),

    /// Core error outside of per-artifact handling.
    #[error("core error: {0}")]
    Core(#[from] artisync_core::CoreError),

    /// A pass plugin failed.
    #[error("plugin {name} failed: {message}")]
    Plugin {
        /// Plugin name.
        name: String,
        /// Failure message.
        message: String,
    },

    /// The periodic scheduler could not start or stop a worker.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl EngineError {
    /// Creates a plugin error.
    pub fn plugin(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plugin {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Classifies the error for pass diagnostics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::PassInProgress { .. } | EngineError::Scheduler(_) => ErrorKind::Pass,
            EngineError::Source(_) => ErrorKind::Source,
            EngineError::Core(e) => e.kind(),
            EngineError::Plugin { .. } => ErrorKind::Plugin,
        }
    }

    /// Returns true if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::PassInProgress { .. } | EngineError::Source(_) => true,
            EngineError::Core(e) => e.is_retryable(),
            EngineError::Plugin { .. } | EngineError::Scheduler(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artisync_source::SourceError;

    #[test]
    fn error_display() {
        let err = EngineError::PassInProgress {
            family: "security".into(),
        };
        assert_eq!(
            err.to_string(),
            "a synchronization pass for security is already in progress"
        );
        assert_eq!(
            EngineError::plugin("routes", "refresh failed").to_string(),
            "plugin routes failed: refresh failed"
        );
    }

    #[test]
    fn error_kinds() {
        let err = EngineError::from(SourceError::NotFound("/a".into()));
        assert_eq!(err.kind(), ErrorKind::Source);
        assert!(err.is_retryable());

        let err = EngineError::from(artisync_core::CoreError::parse("/a", "bad"));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!err.is_retryable());

        assert_eq!(EngineError::plugin("p", "x").kind(), ErrorKind::Plugin);
    }
}
