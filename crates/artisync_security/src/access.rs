//! Synchronizer for `.access` files.

use crate::model::{AccessDefinition, ACCESS_EXTENSION, ACCESS_TYPE};
use crate::registry::{Constraint, SecurityRegistry};
use artisync_core::{
    accepts_extension, ArtifactRecord, ContentHash, CoreError, CoreResult, MetadataStore, Phase,
    Synchronizer,
};
use std::sync::Arc;
use tracing::debug;

/// Applies access constraints to a [`SecurityRegistry`].
///
/// Every constraint depends on the roles it grants, so roles are registered
/// first and revoked last.
pub struct AccessSynchronizer {
    store: Arc<dyn MetadataStore>,
    registry: Arc<SecurityRegistry>,
}

impl AccessSynchronizer {
    /// Creates a synchronizer persisting into `store`.
    pub fn new(store: Arc<dyn MetadataStore>, registry: Arc<SecurityRegistry>) -> Self {
        Self { store, registry }
    }

    /// Re-registers every persisted constraint whose last apply succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(&self) -> CoreResult<usize> {
        let mut restored = 0;
        for record in self.list_persisted()? {
            if record.lifecycle.is_applied() {
                self.registry.register_constraint(Self::constraint(&record));
                restored += 1;
            }
        }
        debug!(constraints = restored, "restored constraints");
        Ok(restored)
    }

    fn constraint(record: &ArtifactRecord) -> Constraint {
        let attr = |key: &str| record.attribute(key).unwrap_or_default().to_string();
        Constraint {
            name: record.name.clone(),
            scope: attr("scope"),
            path: attr("path"),
            method: attr("method"),
            roles: record.dependencies.clone(),
            location: record.location.clone(),
        }
    }
}

impl Synchronizer for AccessSynchronizer {
    fn artifact_type(&self) -> &str {
        ACCESS_TYPE
    }

    fn accepts(&self, location: &str) -> bool {
        accepts_extension(location, ACCESS_EXTENSION)
    }

    fn parse(&self, location: &str, content: &[u8]) -> CoreResult<Vec<ArtifactRecord>> {
        let definitions: Vec<AccessDefinition> =
            serde_json::from_slice(content).map_err(|e| CoreError::parse(location, e))?;
        let hash = ContentHash::of(content);
        definitions
            .into_iter()
            .map(|def| {
                if def.path.is_empty() {
                    return Err(CoreError::parse(location, "constraint without a path"));
                }
                let record = ArtifactRecord::with_hash(
                    ACCESS_TYPE,
                    location,
                    def.effective_name(),
                    hash,
                )
                .with_attribute("scope", def.scope)
                .with_attribute("path", def.path)
                .with_attribute("method", def.method)
                .with_attribute("description", def.description);
                Ok(def
                    .roles
                    .into_iter()
                    .fold(record, |record, role| record.with_dependency(role)))
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
                debug!(constraint = %record.name, %phase, "registering constraint");
                self.registry.register_constraint(Self::constraint(record));
            }
            Phase::Delete => {
                debug!(constraint = %record.name, "revoking constraint");
                self.registry.revoke_constraint_at(&record.name, &record.location);
            }
        }
        Ok(true)
    }
}
