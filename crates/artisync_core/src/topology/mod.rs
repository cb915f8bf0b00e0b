//! Dependency ordering and depletion.
//!
//! A pass orders every record of a family with the [`TopologicalSorter`],
//! wraps each one in a [`TopologyWrapper`] and hands the wrappers to a
//! [`Depleter`], which repeatedly offers apply phases to records whose
//! prerequisites are done until nothing moves.

mod depleter;
mod sorter;
mod wrapper;

pub use depleter::{Depleter, Depletion, Direction};
pub use sorter::{CyclePath, SortOutcome, Sorted, TopologicalSorter};
pub use wrapper::{Outcome, TopologyWrapper};

/// Anything that can be ordered by name and declared dependencies.
pub trait TopologyNode {
    /// Name other nodes use to depend on this one.
    fn node_name(&self) -> &str;

    /// Names this node depends on, in declaration order.
    fn node_dependencies(&self) -> Vec<&str>;
}

impl<T: TopologyNode + ?Sized> TopologyNode for &T {
    fn node_name(&self) -> &str {
        (**self).node_name()
    }

    fn node_dependencies(&self) -> Vec<&str> {
        (**self).node_dependencies()
    }
}

impl TopologyNode for crate::ArtifactRecord {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn node_dependencies(&self) -> Vec<&str> {
        self.dependencies.iter().map(String::as_str).collect()
    }
}
