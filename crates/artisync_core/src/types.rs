//! Core value types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Durable identity of a persisted artifact.
///
/// Assigned on first persist and preserved by every later upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Generates a new random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identity from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 digest of an artifact's source bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hashes the given bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Creates a hash from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the first eight hex characters, for log fields.
    #[must_use]
    pub fn short(&self) -> String {
        self.to_string()[..8].to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

/// Lifecycle state of an artifact.
///
/// ```text
/// New ──────► Created ──┐
///  │                    ├──► Modified ──► Updated
///  └──► Failed ◄────────┘        │
///         │                      ▼
///         └──► New / Modified  Failed
///
/// any non-terminal state ──► Deleted (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Discovered for the first time, or never applied.
    New,
    /// Content changed since the last successful apply.
    Modified,
    /// Created successfully.
    Created,
    /// Updated successfully.
    Updated,
    /// Source disappeared and the artifact was removed.
    Deleted,
    /// Last apply attempt failed.
    Failed,
    /// Read from a store that predates lifecycle tracking.
    Unknown,
}

impl Lifecycle {
    /// Returns true for the states that mean "last apply succeeded".
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Lifecycle::Created | Lifecycle::Updated)
    }

    /// Returns true for states that still need a side effect.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Lifecycle::New | Lifecycle::Modified)
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Deleted)
    }

    /// Returns true if the state machine allows moving to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        if *self == Deleted {
            return false;
        }
        if *self == next {
            return true;
        }
        match (self, next) {
            (_, Deleted) | (_, Failed) => true,
            (New, Created) => true,
            (Modified, Updated) => true,
            (Created | Updated, Modified) => true,
            (Failed, New | Modified) => true,
            (Unknown, New | Modified) => true,
            _ => false,
        }
    }

    /// Returns the name used in logs and persisted state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::New => "NEW",
            Lifecycle::Modified => "MODIFIED",
            Lifecycle::Created => "CREATED",
            Lifecycle::Updated => "UPDATED",
            Lifecycle::Deleted => "DELETED",
            Lifecycle::Failed => "FAILED",
            Lifecycle::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifecycle {
    type Err = std::convert::Infallible;

    /// Parses a lifecycle name. Unrecognized names map to [`Lifecycle::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "NEW" => Lifecycle::New,
            "MODIFIED" => Lifecycle::Modified,
            "CREATED" => Lifecycle::Created,
            "UPDATED" => Lifecycle::Updated,
            "DELETED" => Lifecycle::Deleted,
            "FAILED" => Lifecycle::Failed,
            _ => Lifecycle::Unknown,
        })
    }
}

/// Phase offered to a synchronizer's `apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Create the side effects of a new artifact.
    Create,
    /// Refresh the side effects of a modified artifact.
    Update,
    /// Remove the side effects of an orphan.
    Delete,
}

impl Phase {
    /// Lifecycle reached when this phase succeeds.
    #[must_use]
    pub const fn target(&self) -> Lifecycle {
        match self {
            Phase::Create => Lifecycle::Created,
            Phase::Update => Lifecycle::Updated,
            Phase::Delete => Lifecycle::Deleted,
        }
    }

    /// Returns true if this phase fits a record in `lifecycle`.
    #[must_use]
    pub const fn fits(&self, lifecycle: Lifecycle) -> bool {
        matches!(
            (self, lifecycle),
            (Phase::Create, Lifecycle::New)
                | (Phase::Update, Lifecycle::Modified)
                | (Phase::Delete, _)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
        })
    }
}
