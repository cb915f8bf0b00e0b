//! Orchestration registry.
//!
//! A [`Registry`] is built once at initialization and handed to a driver by
//! value. Synchronizers are kept in global priority order; plugins run after
//! every pass in their own priority order.

use crate::error::EngineResult;
use crate::result::PassResult;
use artisync_core::Synchronizer;
use std::sync::Arc;

/// A hook evaluated at the end of every pass.
///
/// Plugins see the pass result as collected so far (e.g. to refresh routes
/// after security constraints changed). A failing plugin is reported as a
/// diagnostic and never rolls back artifact state.
pub trait SynchronizationPlugin: Send + Sync {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Lower values run first.
    fn priority(&self) -> i32 {
        0
    }

    /// Runs the plugin.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin failed.
    fn run(&self, result: &PassResult) -> EngineResult<()>;
}

/// The ordered synchronizers and plugins of one family.
#[derive(Clone, Default)]
pub struct Registry {
    synchronizers: Vec<Arc<dyn Synchronizer>>,
    plugins: Vec<Arc<dyn SynchronizationPlugin>>,
}

impl Registry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Synchronizers in priority order.
    #[must_use]
    pub fn synchronizers(&self) -> &[Arc<dyn Synchronizer>] {
        &self.synchronizers
    }

    /// Plugins in priority order.
    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn SynchronizationPlugin>] {
        &self.plugins
    }

    /// Returns the index of the synchronizer with `id`.
    #[must_use]
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.synchronizers.iter().position(|s| s.id() == id)
    }

    /// Returns the number of synchronizers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.synchronizers.len()
    }

    /// Returns true if no synchronizer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.synchronizers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field(
                "synchronizers",
                &self.synchronizers.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    synchronizers: Vec<(i32, Arc<dyn Synchronizer>)>,
    plugins: Vec<Arc<dyn SynchronizationPlugin>>,
}

impl RegistryBuilder {
    /// Registers a synchronizer. Lower priorities run first; equal
    /// priorities keep registration order.
    #[must_use]
    pub fn with_synchronizer(mut self, priority: i32, synchronizer: Arc<dyn Synchronizer>) -> Self {
        self.synchronizers.push((priority, synchronizer));
        self
    }

    /// Registers a plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Arc<dyn SynchronizationPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        let mut synchronizers = self.synchronizers;
        synchronizers.sort_by_key(|(priority, _)| *priority);
        let mut plugins = self.plugins;
        plugins.sort_by_key(|p| p.priority());
        Registry {
            synchronizers: synchronizers.into_iter().map(|(_, s)| s).collect(),
            plugins,
        }
    }
}
