//! Per-pass wrapper around an artifact record.

use super::TopologyNode;
use crate::artifact::ArtifactRecord;
use crate::error::CoreError;
use crate::types::Phase;

/// What happened to a wrapper during the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not yet processed.
    Pending,
    /// Content unchanged since the last successful apply; no phase offered.
    Unchanged,
    /// A phase returned `Ok(true)`.
    Advanced(Phase),
    /// Every offered phase returned `Ok(false)`.
    Skipped,
    /// Apply failed, dependencies never completed, or the record was blocked.
    Failed,
}

/// Pairs a record with its per-pass bookkeeping.
#[derive(Debug)]
pub struct TopologyWrapper {
    /// The record being synchronized.
    pub record: ArtifactRecord,
    /// Index of the owning synchronizer in the registry.
    pub synchronizer: usize,
    /// Dependencies not resolvable within the family batch.
    pub external: Vec<String>,
    /// True once the record needs nothing more this pass.
    pub completed: bool,
    /// Pass outcome.
    pub outcome: Outcome,
    /// Last error seen this pass.
    pub error: Option<CoreError>,
    /// The record could not be loaded or saved; outcomes are reported but
    /// never persisted.
    pub detached: bool,
}

impl TopologyWrapper {
    /// Wraps a record that still needs work.
    pub fn new(record: ArtifactRecord, synchronizer: usize) -> Self {
        Self {
            record,
            synchronizer,
            external: Vec::new(),
            completed: false,
            outcome: Outcome::Pending,
            error: None,
            detached: false,
        }
    }

    /// Wraps a record whose content is unchanged. It counts as completed so
    /// dependents are not held back.
    pub fn unchanged(record: ArtifactRecord, synchronizer: usize) -> Self {
        Self {
            completed: true,
            outcome: Outcome::Unchanged,
            ..Self::new(record, synchronizer)
        }
    }

    /// Creates a failed wrapper for a record whose persisted state could not
    /// be read or written.
    ///
    /// It stays in the batch so dependents wait on it.
    pub fn detached(record: ArtifactRecord, synchronizer: usize, error: CoreError) -> Self {
        let mut wrapper = Self::new(record, synchronizer);
        wrapper.block(error);
        wrapper.detached = true;
        wrapper
    }

    /// Marks the wrapper failed before depletion starts.
    pub fn block(&mut self, error: CoreError) {
        self.completed = false;
        self.outcome = Outcome::Failed;
        self.error = Some(error);
    }

    /// Returns true if the wrapper can still be offered a phase.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.completed && self.outcome == Outcome::Pending
    }

    /// Returns true if the wrapper ended failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

impl TopologyNode for TopologyWrapper {
    fn node_name(&self) -> &str {
        &self.record.name
    }

    fn node_dependencies(&self) -> Vec<&str> {
        self.record.node_dependencies()
    }
}
