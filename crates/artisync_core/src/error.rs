//! Error types for artisync core.

use crate::types::{Lifecycle, Phase};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while parsing, ordering, applying or persisting artifacts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed source content. The artifact is skipped for this pass.
    #[error("cannot parse {location}: {message}")]
    Parse {
        /// Location of the malformed definition.
        location: String,
        /// Parser message.
        message: String,
    },

    /// A dependency cycle inside one batch.
    #[error("cyclic dependency: {path}")]
    CyclicDependency {
        /// The cycle, first and last element equal.
        path: crate::topology::CyclePath,
    },

    /// The artifact was still waiting on dependencies when depletion stopped.
    #[error("unresolved dependencies of {name}: {}", missing.join(", "))]
    UnresolvedDependency {
        /// Name of the waiting artifact.
        name: String,
        /// Dependencies that never completed.
        missing: Vec<String>,
    },

    /// A side effect failed.
    #[error("{phase} of {location} failed: {message}")]
    Apply {
        /// Location of the artifact.
        location: String,
        /// Phase being applied.
        phase: Phase,
        /// Failure message.
        message: String,
    },

    /// The metadata store rejected an operation.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Two artifacts in one batch declare the same name.
    #[error("duplicate artifact {name} at {location}, already defined at {existing}")]
    DuplicateArtifact {
        /// Shared name.
        name: String,
        /// Location of the rejected artifact.
        location: String,
        /// Location of the artifact that keeps the name.
        existing: String,
    },

    /// Lifecycle transition not allowed by the state machine.
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        /// Current lifecycle.
        from: Lifecycle,
        /// Attempted lifecycle.
        to: Lifecycle,
    },

    /// Content source error.
    #[error("source error: {0}")]
    Source(#[from] artisync_source::SourceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding or decoding of persisted state failed.
    #[error("codec error: {0}")]
    Codec(String),
}

impl CoreError {
    /// Creates a parse error.
    pub fn parse(location: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Creates an apply error.
    pub fn apply(location: impl Into<String>, phase: Phase, message: impl fmt::Display) -> Self {
        Self::Apply {
            location: location.into(),
            phase,
            message: message.to_string(),
        }
    }

    /// Creates a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Creates a codec error.
    pub fn codec(message: impl fmt::Display) -> Self {
        Self::Codec(message.to_string())
    }

    /// Classifies the error for pass diagnostics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Parse { .. } => ErrorKind::Parse,
            CoreError::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            CoreError::UnresolvedDependency { .. } => ErrorKind::UnresolvedDependency,
            CoreError::Apply { .. } => ErrorKind::Apply,
            CoreError::DuplicateArtifact { .. } => ErrorKind::Duplicate,
            CoreError::InvalidTransition { .. } => ErrorKind::Transition,
            CoreError::Source(_) => ErrorKind::Source,
            CoreError::Persistence(_) | CoreError::Io(_) | CoreError::Codec(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Returns true if a later pass may succeed without a source change.
    ///
    /// Parse errors, duplicates and cycles only go away when the definitions
    /// are edited; everything else may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CoreError::Parse { .. }
                | CoreError::DuplicateArtifact { .. }
                | CoreError::CyclicDependency { .. }
                | CoreError::InvalidTransition { .. }
        )
    }
}

/// Coarse classification used in pass diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed definition.
    Parse,
    /// Cycle in a batch.
    CyclicDependency,
    /// Dependency never completed.
    UnresolvedDependency,
    /// Side effect failed.
    Apply,
    /// Store operation failed.
    Persistence,
    /// Duplicate artifact name.
    Duplicate,
    /// Lifecycle transition rejected.
    Transition,
    /// Source enumeration or read failed.
    Source,
    /// A pass plugin failed.
    Plugin,
    /// The pass itself could not run (e.g. another pass holds the lock).
    Pass,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Parse => "parse",
            ErrorKind::CyclicDependency => "cyclic-dependency",
            ErrorKind::UnresolvedDependency => "unresolved-dependency",
            ErrorKind::Apply => "apply",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Transition => "transition",
            ErrorKind::Source => "source",
            ErrorKind::Plugin => "plugin",
            ErrorKind::Pass => "pass",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::CyclePath;

    #[test]
    fn error_display() {
        let err = CoreError::parse("/a.roles", "expected array");
        assert_eq!(err.to_string(), "cannot parse /a.roles: expected array");

        let err = CoreError::CyclicDependency {
            path: CyclePath::new(vec!["a".into(), "b".into(), "a".into()]),
        };
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");

        let err = CoreError::UnresolvedDependency {
            name: "orders:read".into(),
            missing: vec!["admin".into(), "auditor".into()],
        };
        assert_eq!(
            err.to_string(),
            "unresolved dependencies of orders:read: admin, auditor"
        );

        let err = CoreError::apply("/x.job", Phase::Create, "boom");
        assert_eq!(err.to_string(), "create of /x.job failed: boom");
    }

    #[test]
    fn error_kinds() {
        assert_eq!(CoreError::parse("/a", "x").kind(), ErrorKind::Parse);
        assert_eq!(CoreError::persistence("x").kind(), ErrorKind::Persistence);
        assert_eq!(CoreError::codec("x").kind(), ErrorKind::Persistence);
        assert_eq!(
            CoreError::apply("/a", Phase::Delete, "x").kind(),
            ErrorKind::Apply
        );
    }

    #[test]
    fn retryable_errors() {
        assert!(CoreError::apply("/a", Phase::Update, "locked").is_retryable());
        assert!(CoreError::persistence("timeout").is_retryable());
        assert!(!CoreError::parse("/a", "bad json").is_retryable());
        assert!(!CoreError::DuplicateArtifact {
            name: "a".into(),
            location: "/2".into(),
            existing: "/1".into(),
        }
        .is_retryable());
    }
}
