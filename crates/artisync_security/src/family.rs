//! Wiring of the security family.

use crate::access::AccessSynchronizer;
use crate::registry::SecurityRegistry;
use crate::roles::RoleSynchronizer;
use artisync_core::{CoreResult, InMemoryStore, MetadataStore};
use artisync_engine::{FamilyConfig, ReconciliationDriver, Registry};
use artisync_source::ContentSource;
use std::sync::Arc;
use tracing::info;

/// Registry priority of role definitions.
pub const ROLE_PRIORITY: i32 = 100;

/// Registry priority of access constraints.
pub const ACCESS_PRIORITY: i32 = 200;

/// The role and access synchronizers sharing one [`SecurityRegistry`].
#[derive(Clone)]
pub struct SecurityFamily {
    roles: Arc<RoleSynchronizer>,
    access: Arc<AccessSynchronizer>,
    security: Arc<SecurityRegistry>,
}

impl SecurityFamily {
    /// Creates the family with in-memory metadata stores.
    pub fn in_memory() -> Self {
        Self::assemble(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new()))
    }

    /// Creates the family with the given metadata stores.
    ///
    /// Roles and constraints already applied according to the stores are
    /// registered before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read.
    pub fn with_stores(
        role_store: Arc<dyn MetadataStore>,
        access_store: Arc<dyn MetadataStore>,
    ) -> CoreResult<Self> {
        let family = Self::assemble(role_store, access_store);
        family.restore()?;
        Ok(family)
    }

    fn assemble(role_store: Arc<dyn MetadataStore>, access_store: Arc<dyn MetadataStore>) -> Self {
        let security = Arc::new(SecurityRegistry::new());
        Self {
            roles: Arc::new(RoleSynchronizer::new(role_store, Arc::clone(&security))),
            access: Arc::new(AccessSynchronizer::new(access_store, Arc::clone(&security))),
            security,
        }
    }

    /// Rebuilds the security registry from the persisted records.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read.
    pub fn restore(&self) -> CoreResult<usize> {
        let roles = self.roles.restore()?;
        let constraints = self.access.restore()?;
        info!(roles, constraints, "security registry restored");
        Ok(roles + constraints)
    }

    /// The shared security registry.
    pub fn security(&self) -> &Arc<SecurityRegistry> {
        &self.security
    }

    /// The role synchronizer.
    pub fn roles(&self) -> &Arc<RoleSynchronizer> {
        &self.roles
    }

    /// The access synchronizer.
    pub fn access(&self) -> &Arc<AccessSynchronizer> {
        &self.access
    }

    /// Orchestration registry with roles ahead of access constraints.
    pub fn registry(&self) -> Registry {
        Registry::builder()
            .with_synchronizer(ROLE_PRIORITY, self.roles.clone())
            .with_synchronizer(ACCESS_PRIORITY, self.access.clone())
            .build()
    }

    /// Builds a driver for this family over `source`.
    pub fn driver(&self, config: FamilyConfig, source: Arc<dyn ContentSource>) -> ReconciliationDriver {
        ReconciliationDriver::new(config, self.registry(), source)
    }
}

impl std::fmt::Debug for SecurityFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityFamily")
            .field("security", &self.security)
            .finish()
    }
}
