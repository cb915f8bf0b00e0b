//! Change detection against the persisted snapshot.

use crate::artifact::ArtifactRecord;
use crate::types::{ContentHash, Lifecycle};

/// Outcome of comparing a freshly parsed record with its persisted copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    /// Persisted lifecycle, `None` if the record was never persisted.
    pub from: Option<Lifecycle>,
    /// Lifecycle the fresh record starts the pass in.
    pub to: Lifecycle,
    /// Whether an apply phase must run.
    pub requires_apply: bool,
}

impl Change {
    /// Returns true if the lifecycle moves.
    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.from != Some(self.to)
    }
}

/// Decides the starting lifecycle of a fresh record.
///
/// | persisted                                 | result           |
/// |-------------------------------------------|------------------|
/// | absent                                    | `New`            |
/// | never applied                             | `New`            |
/// | applied hash differs                      | `Modified`       |
/// | applied hash equal, last outcome success  | unchanged        |
/// | applied hash equal, last outcome `Failed` | `Modified`       |
#[must_use]
pub fn detect_change(persisted: Option<&ArtifactRecord>, fresh: &ContentHash) -> Change {
    let Some(persisted) = persisted else {
        return Change {
            from: None,
            to: Lifecycle::New,
            requires_apply: true,
        };
    };
    let from = Some(persisted.lifecycle);

    let Some(applied) = persisted.applied_hash else {
        return Change {
            from,
            to: Lifecycle::New,
            requires_apply: true,
        };
    };

    if applied != *fresh || !persisted.lifecycle.is_applied() {
        return Change {
            from,
            to: Lifecycle::Modified,
            requires_apply: true,
        };
    }

    Change {
        from,
        to: persisted.lifecycle,
        requires_apply: false,
    }
}
