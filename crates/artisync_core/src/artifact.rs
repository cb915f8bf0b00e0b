//! The artifact record model.

use crate::error::{CoreError, CoreResult};
use crate::types::{ArtifactId, ContentHash, Lifecycle, Phase};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One discovered artifact definition.
///
/// A record is rebuilt from freshly parsed bytes every pass; the persisted
/// copy in the [`MetadataStore`](crate::MetadataStore) carries the durable
/// [`ArtifactId`], the last applied hash and the lifecycle between passes.
///
/// # Example
///
/// ```rust
/// use artisync_core::{ArtifactRecord, Lifecycle};
///
/// let record = ArtifactRecord::new("access", "/shop/orders.access", "orders:read", b"[]")
///     .with_dependency("admin");
/// assert_eq!(record.key(), "access:/shop/orders.access:orders:read");
/// assert_eq!(record.lifecycle, Lifecycle::New);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Durable identity, assigned on first persist.
    pub id: Option<ArtifactId>,
    /// Owning artifact type.
    pub artifact_type: String,
    /// Source location.
    pub location: String,
    /// Name other artifacts use to depend on this one.
    pub name: String,
    /// Digest of the source bytes.
    pub content_hash: ContentHash,
    /// Digest of the content last applied successfully.
    pub applied_hash: Option<ContentHash>,
    /// Names of the artifacts this one depends on.
    pub dependencies: BTreeSet<String>,
    /// Current lifecycle state.
    pub lifecycle: Lifecycle,
    /// Message of the last failure, cleared on success.
    pub last_error: Option<String>,
    /// Type-specific properties.
    pub attributes: BTreeMap<String, String>,
}

impl ArtifactRecord {
    /// Creates a new record in the `New` state, hashing `content`.
    pub fn new(
        artifact_type: impl Into<String>,
        location: impl Into<String>,
        name: impl Into<String>,
        content: &[u8],
    ) -> Self {
        Self::with_hash(artifact_type, location, name, ContentHash::of(content))
    }

    /// Creates a new record with a precomputed content hash.
    ///
    /// Parsers that emit several records from one file hash the file once and
    /// share the digest.
    pub fn with_hash(
        artifact_type: impl Into<String>,
        location: impl Into<String>,
        name: impl Into<String>,
        content_hash: ContentHash,
    ) -> Self {
        Self {
            id: None,
            artifact_type: artifact_type.into(),
            location: location.into(),
            name: name.into(),
            content_hash,
            applied_hash: None,
            dependencies: BTreeSet::new(),
            lifecycle: Lifecycle::New,
            last_error: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a dependency by name. Duplicates are ignored.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    /// Adds a type-specific attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Store key: `type:location:name`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.artifact_type, self.location, self.name)
    }

    /// Moves to `next`, enforcing the lifecycle state machine.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if the move is not allowed.
    pub fn transition_to(&mut self, next: Lifecycle) -> CoreResult<()> {
        if !self.lifecycle.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.lifecycle,
                to: next,
            });
        }
        self.lifecycle = next;
        Ok(())
    }

    /// Records a successful `phase`.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase target is not reachable from the current
    /// lifecycle.
    pub fn mark_applied(&mut self, phase: Phase) -> CoreResult<()> {
        self.transition_to(phase.target())?;
        if phase != Phase::Delete {
            self.applied_hash = Some(self.content_hash);
        }
        self.last_error = None;
        Ok(())
    }

    /// Records a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is already deleted.
    pub fn mark_failed(&mut self, message: impl Into<String>) -> CoreResult<()> {
        self.transition_to(Lifecycle::Failed)?;
        self.last_error = Some(message.into());
        Ok(())
    }
}
