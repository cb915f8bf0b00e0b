//! Layered content source.
//!
//! Platforms ship *predelivered* definitions (bundled with the binary) next
//! to the live registry that users publish into. A [`LayeredSource`] merges
//! any number of sources into one view:
//!
//! - Layers are consulted in registration order
//! - A later layer shadows an earlier one at the same location
//! - Existence is true if any layer holds the location

use crate::error::{SourceError, SourceResult};
use crate::source::{normalize_location, ContentSource, SourceEntry};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A source that merges several sources into one.
///
/// # Example
///
/// ```rust
/// use artisync_source::{ContentSource, InMemorySource, LayeredSource};
/// use std::sync::Arc;
///
/// let predelivered = Arc::new(InMemorySource::new());
/// predelivered.put("/base.roles", b"base".to_vec()).unwrap();
/// let registry = Arc::new(InMemorySource::new());
/// registry.put("/base.roles", b"override".to_vec()).unwrap();
///
/// let source = LayeredSource::new()
///     .with_layer(predelivered)
///     .with_layer(registry);
/// assert_eq!(source.read("/base.roles").unwrap(), b"override");
/// ```
#[derive(Default)]
pub struct LayeredSource {
    layers: Vec<Arc<dyn ContentSource>>,
}

impl LayeredSource {
    /// Creates a source with no layers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer on top of the existing ones.
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn ContentSource>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl std::fmt::Debug for LayeredSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredSource")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl ContentSource for LayeredSource {
    fn list_candidates(&self, filter: &dyn Fn(&str) -> bool) -> SourceResult<Vec<SourceEntry>> {
        let mut merged = BTreeMap::new();
        for layer in &self.layers {
            for entry in layer.list_candidates(filter)? {
                merged.insert(entry.location.clone(), entry);
            }
        }
        Ok(merged.into_values().collect())
    }

    fn exists(&self, location: &str) -> SourceResult<bool> {
        for layer in &self.layers {
            if layer.exists(location)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read(&self, location: &str) -> SourceResult<Vec<u8>> {
        for layer in self.layers.iter().rev() {
            match layer.read(location) {
                Ok(content) => return Ok(content),
                Err(SourceError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(SourceError::NotFound(normalize_location(location)?))
    }
}
