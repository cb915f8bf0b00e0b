//! Topological sort with cycle detection.

use super::TopologyNode;
use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;
use std::fmt;

/// A dependency cycle. The first and last element are the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(Vec<String>);

impl CyclePath {
    /// Creates a cycle path.
    pub fn new(path: Vec<String>) -> Self {
        Self(path)
    }

    /// Returns the names along the cycle.
    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.0
    }

    /// Returns true if `name` is on the cycle.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

/// A successful ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sorted {
    /// Names in dependency order.
    pub order: Vec<String>,
    /// Input indices in dependency order.
    pub indices: Vec<usize>,
    /// Every dependency name not present in the input, first-seen order.
    pub external: Vec<String>,
    /// External dependency names per input index.
    pub external_by_node: Vec<Vec<String>>,
}

/// Result of a sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Every node ordered.
    Ordered(Sorted),
    /// The batch contains a cycle; nothing is ordered.
    Cyclic(CyclePath),
}

impl SortOutcome {
    /// Returns the ordering, if any.
    #[must_use]
    pub fn ordered(&self) -> Option<&Sorted> {
        match self {
            SortOutcome::Ordered(sorted) => Some(sorted),
            SortOutcome::Cyclic(_) => None,
        }
    }

    /// Converts the outcome into a result.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CyclicDependency`] for a cyclic batch.
    pub fn into_result(self) -> CoreResult<Sorted> {
        match self {
            SortOutcome::Ordered(sorted) => Ok(sorted),
            SortOutcome::Cyclic(path) => Err(CoreError::CyclicDependency { path }),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Emitted,
}

struct Frame<'a> {
    node: usize,
    dependencies: Vec<&'a str>,
    next: usize,
}

/// Orders nodes so every dependency precedes its dependents.
///
/// Iterative depth-first search with an explicit frame stack, so deep chains
/// cannot overflow the call stack. Independent nodes keep their input order.
///
/// # Example
///
/// ```rust
/// use artisync_core::{ArtifactRecord, SortOutcome, TopologicalSorter};
///
/// let records = vec![
///     ArtifactRecord::new("job", "/a.job", "a", b"").with_dependency("b"),
///     ArtifactRecord::new("job", "/b.job", "b", b"").with_dependency("c"),
///     ArtifactRecord::new("job", "/c.job", "c", b""),
/// ];
/// let SortOutcome::Ordered(sorted) = TopologicalSorter::sort(&records) else {
///     panic!("acyclic");
/// };
/// assert_eq!(sorted.order, vec!["c", "b", "a"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalSorter;

impl TopologicalSorter {
    /// Sorts `nodes`.
    ///
    /// Names must be unique within `nodes`; on duplicates the first occurrence
    /// owns the name.
    pub fn sort<N: TopologyNode>(nodes: &[N]) -> SortOutcome {
        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            by_name.entry(node.node_name()).or_insert(i);
        }

        let mut marks = vec![Mark::Unvisited; nodes.len()];
        let mut sorted = Sorted {
            external_by_node: vec![Vec::new(); nodes.len()],
            ..Sorted::default()
        };
        let mut stack: Vec<Frame<'_>> = Vec::new();

        for root in 0..nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::OnStack;
            stack.push(Frame {
                node: root,
                dependencies: nodes[root].node_dependencies(),
                next: 0,
            });

            while let Some(frame) = stack.last_mut() {
                if frame.next == frame.dependencies.len() {
                    let node = frame.node;
                    stack.pop();
                    marks[node] = Mark::Emitted;
                    sorted.order.push(nodes[node].node_name().to_string());
                    sorted.indices.push(node);
                    continue;
                }

                let current = frame.node;
                let dependency = frame.dependencies[frame.next];
                frame.next += 1;

                let Some(&target) = by_name.get(dependency) else {
                    let hints = &mut sorted.external_by_node[current];
                    if !hints.iter().any(|h| h == dependency) {
                        hints.push(dependency.to_string());
                    }
                    if !sorted.external.iter().any(|h| h == dependency) {
                        sorted.external.push(dependency.to_string());
                    }
                    continue;
                };

                match marks[target] {
                    Mark::Emitted => {}
                    Mark::OnStack => {
                        let start = stack
                            .iter()
                            .position(|f| f.node == target)
                            .unwrap_or(0);
                        let mut path: Vec<String> = stack[start..]
                            .iter()
                            .map(|f| nodes[f.node].node_name().to_string())
                            .collect();
                        path.push(nodes[target].node_name().to_string());
                        return SortOutcome::Cyclic(CyclePath::new(path));
                    }
                    Mark::Unvisited => {
                        marks[target] = Mark::OnStack;
                        stack.push(Frame {
                            node: target,
                            dependencies: nodes[target].node_dependencies(),
                            next: 0,
                        });
                    }
                }
            }
        }

        SortOutcome::Ordered(sorted)
    }
}
