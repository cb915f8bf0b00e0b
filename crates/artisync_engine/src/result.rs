//! Pass results and diagnostics.

use artisync_core::{ArtifactRecord, CoreError, ErrorKind};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

/// Terminal status of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassStatus {
    /// Every artifact reached its target state.
    Successful,
    /// The pass was aborted or at least one artifact failed.
    Failed,
    /// The family is disabled and the pass was not forced.
    Disabled,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassStatus::Successful => "successful",
            PassStatus::Failed => "failed",
            PassStatus::Disabled => "disabled",
        })
    }
}

/// Identifies an artifact in a pass result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactRef {
    /// Owning synchronizer id.
    pub synchronizer: String,
    /// Source location.
    pub location: String,
    /// Artifact name.
    pub name: String,
}

impl ArtifactRef {
    /// Creates a reference to `record` owned by `synchronizer`.
    pub fn of(synchronizer: &str, record: &ArtifactRecord) -> Self {
        Self {
            synchronizer: synchronizer.to_string(),
            location: record.location.clone(),
            name: record.name.clone(),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.synchronizer, self.location, self.name)
    }
}

/// One problem reported by a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Offending location, if the problem is tied to one.
    pub location: Option<String>,
    /// Synchronizer that reported the problem.
    pub synchronizer: Option<String>,
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic from a core error.
    pub fn from_error(synchronizer: &str, location: impl Into<String>, error: &CoreError) -> Self {
        Self {
            location: Some(location.into()),
            synchronizer: Some(synchronizer.to_string()),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Creates a diagnostic not tied to a location.
    pub fn pass_level(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            location: None,
            synchronizer: None,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {}: {}", self.kind, location, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Aggregate outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Family the pass ran for.
    pub family: String,
    /// Whether the enabled check was bypassed.
    pub forced: bool,
    /// Whether the pass stopped early (lock held or source failure).
    pub aborted: bool,
    /// Terminal status.
    pub status: PassStatus,
    /// Artifacts that were created or updated.
    pub advanced: Vec<ArtifactRef>,
    /// Artifacts for which every offered phase was a no-op.
    pub skipped: Vec<ArtifactRef>,
    /// Artifacts unchanged since their last successful apply.
    pub unchanged: Vec<ArtifactRef>,
    /// Artifacts that failed.
    pub failed: Vec<ArtifactRef>,
    /// Orphans removed this pass.
    pub deleted: Vec<ArtifactRef>,
    /// Problems reported during the pass.
    pub diagnostics: Vec<Diagnostic>,
    /// Dependencies not resolvable within the family, by artifact name.
    pub external: BTreeMap<String, Vec<String>>,
    /// Wall-clock start.
    pub started_at: SystemTime,
    /// Pass duration.
    pub duration: Duration,
}

impl PassResult {
    /// Creates an empty result for `family`.
    pub fn new(family: impl Into<String>, forced: bool) -> Self {
        Self {
            family: family.into(),
            forced,
            aborted: false,
            status: PassStatus::Successful,
            advanced: Vec::new(),
            skipped: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
            deleted: Vec::new(),
            diagnostics: Vec::new(),
            external: BTreeMap::new(),
            started_at: SystemTime::now(),
            duration: Duration::ZERO,
        }
    }

    /// Marks the pass as aborted with a pass-level diagnostic.
    pub fn abort(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.aborted = true;
        self.diagnostics.push(Diagnostic::pass_level(kind, message));
    }

    /// Fixes the terminal status and duration.
    pub fn finish(&mut self, duration: Duration) {
        self.duration = duration;
        if self.status != PassStatus::Disabled {
            self.status = if self.aborted || !self.diagnostics.is_empty() {
                PassStatus::Failed
            } else {
                PassStatus::Successful
            };
        }
    }

    /// Returns true if the pass succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status == PassStatus::Successful
    }

    /// Returns diagnostics of `kind`.
    pub fn diagnostics_of(&self, kind: ErrorKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Returns the names of the advanced artifacts, in application order.
    #[must_use]
    pub fn advanced_names(&self) -> Vec<&str> {
        self.advanced.iter().map(|a| a.name.as_str()).collect()
    }

    /// Returns true if the artifact named `name` failed.
    #[must_use]
    pub fn has_failed(&self, name: &str) -> bool {
        self.failed.iter().any(|a| a.name == name)
    }

    /// One-line summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} pass {}: {} advanced, {} unchanged, {} failed, {} deleted in {:?}",
            self.family,
            self.status,
            self.advanced.len(),
            self.unchanged.len(),
            self.failed.len(),
            self.deleted.len(),
            self.duration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_status_from_diagnostics() {
        let mut result = PassResult::new("security", false);
        result.finish(Duration::from_millis(3));
        assert!(result.is_successful());

        let mut result = PassResult::new("security", false);
        let err = CoreError::parse("/a.roles", "expected array");
        result
            .diagnostics
            .push(Diagnostic::from_error("role", "/a.roles", &err));
        result.finish(Duration::ZERO);
        assert_eq!(result.status, PassStatus::Failed);
        assert_eq!(result.diagnostics_of(ErrorKind::Parse).count(), 1);
    }

    #[test]
    fn result_abort() {
        let mut result = PassResult::new("jobs", true);
        result.abort(ErrorKind::Pass, "busy");
        result.finish(Duration::ZERO);
        assert!(result.aborted);
        assert!(result.forced);
        assert_eq!(result.status, PassStatus::Failed);
        assert_eq!(result.diagnostics[0].to_string(), "[pass] busy");
    }

    #[test]
    fn result_disabled_is_kept() {
        let mut result = PassResult::new("jobs", false);
        result.status = PassStatus::Disabled;
        result.finish(Duration::ZERO);
        assert_eq!(result.status, PassStatus::Disabled);
    }

    #[test]
    fn artifact_ref_display() {
        let record = ArtifactRecord::new("role", "/a.roles", "admin", b"");
        let r = ArtifactRef::of("role", &record);
        assert_eq!(r.to_string(), "role:/a.roles:admin");
    }
}
