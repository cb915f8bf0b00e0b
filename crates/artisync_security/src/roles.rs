//! Synchronizer for `.roles` files.

use crate::model::{RoleDefinition, ROLE_EXTENSION, ROLE_TYPE};
use crate::registry::{Role, SecurityRegistry};
use artisync_core::{
    accepts_extension, ArtifactRecord, ContentHash, CoreError, CoreResult, MetadataStore, Phase,
    Synchronizer,
};
use std::sync::Arc;
use tracing::debug;

/// Applies role definitions to a [`SecurityRegistry`].
pub struct RoleSynchronizer {
    store: Arc<dyn MetadataStore>,
    registry: Arc<SecurityRegistry>,
}

impl RoleSynchronizer {
    /// Creates a synchronizer persisting into `store`.
    pub fn new(store: Arc<dyn MetadataStore>, registry: Arc<SecurityRegistry>) -> Self {
        Self { store, registry }
    }

    /// Re-registers every persisted role whose last apply succeeded.
    ///
    /// Unchanged records are never applied again, so a registry built over a
    /// durable store must be restored before the first pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(&self) -> CoreResult<usize> {
        let applied: Vec<_> = self
            .list_persisted()?
            .into_iter()
            .filter(|r| r.lifecycle.is_applied())
            .collect();
        for record in &applied {
            self.registry.register_role(Self::role(record));
        }
        debug!(roles = applied.len(), "restored roles");
        Ok(applied.len())
    }

    fn role(record: &ArtifactRecord) -> Role {
        Role {
            name: record.name.clone(),
            description: record.attribute("description").unwrap_or_default().to_string(),
            location: record.location.clone(),
        }
    }
}

impl Synchronizer for RoleSynchronizer {
    fn artifact_type(&self) -> &str {
        ROLE_TYPE
    }

    fn accepts(&self, location: &str) -> bool {
        accepts_extension(location, ROLE_EXTENSION)
    }

    fn parse(&self, location: &str, content: &[u8]) -> CoreResult<Vec<ArtifactRecord>> {
        let roles: Vec<RoleDefinition> =
            serde_json::from_slice(content).map_err(|e| CoreError::parse(location, e))?;
        let hash = ContentHash::of(content);
        roles
            .into_iter()
            .map(|role| {
                if role.name.trim().is_empty() {
                    return Err(CoreError::parse(location, "role without a name"));
                }
                Ok(ArtifactRecord::with_hash(ROLE_TYPE, location, role.name, hash)
                    .with_attribute("description", role.description))
            })
            .collect()
    }

    fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    fn apply(&self, record: &ArtifactRecord, phase: Phase) -> CoreResult<bool> {
        if !phase.fits(record.lifecycle) {
            return Ok(false);
        }
        match phase {
            Phase::Create | Phase::Update => {
                debug!(role = %record.name, %phase, "registering role");
                self.registry.register_role(Self::role(record));
            }
            Phase::Delete => {
                debug!(role = %record.name, "revoking role");
                self.registry.revoke_role_at(&record.name, &record.location);
            }
        }
        Ok(true)
    }
}
