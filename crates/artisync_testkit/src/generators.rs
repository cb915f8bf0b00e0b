//! Property-based test generators using proptest.
//!
//! Provides strategies for dependency graphs of artifact records. Names are
//! `n0`, `n1`, ... so failures shrink to readable cases.

use artisync_core::ArtifactRecord;
use proptest::prelude::*;

fn node(index: usize, dependencies: impl IntoIterator<Item = usize>) -> ArtifactRecord {
    dependencies.into_iter().fold(
        ArtifactRecord::new("job", format!("/n{index}.job"), format!("n{index}"), &[index as u8]),
        |record, d| record.with_dependency(format!("n{d}")),
    )
}

/// Strategy for valid artifact names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_:-]{0,15}").expect("Invalid regex")
}

/// Strategy for acyclic batches of up to `max_nodes` records.
///
/// Node `i` only depends on nodes with a lower index; the batch is shuffled
/// so input order says nothing about dependency order.
pub fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<ArtifactRecord>> {
    (1..=max_nodes.max(1))
        .prop_flat_map(|n| {
            prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), n)
        })
        .prop_map(|picks| {
            picks
                .iter()
                .enumerate()
                .map(|(i, deps)| {
                    let deps: Vec<usize> = if i == 0 {
                        Vec::new()
                    } else {
                        deps.iter().map(|d| d.index(i)).collect()
                    };
                    node(i, deps)
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// Strategy for batches that contain at least one cycle.
///
/// Nodes `0..k` form a ring (`k == 1` is a self-dependency); the rest is a
/// random DAG that may depend on the ring.
pub fn cyclic_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<ArtifactRecord>> {
    let max_nodes = max_nodes.max(1);
    (1..=max_nodes)
        .prop_flat_map(move |ring| {
            (
                Just(ring),
                prop::collection::vec(
                    prop::collection::vec(any::<prop::sample::Index>(), 0..3),
                    0..=(max_nodes - ring),
                ),
            )
        })
        .prop_map(|(ring, tail)| {
            let mut records: Vec<_> = (0..ring).map(|i| node(i, [(i + 1) % ring])).collect();
            for (offset, deps) in tail.iter().enumerate() {
                let i = ring + offset;
                records.push(node(i, deps.iter().map(|d| d.index(i)).collect::<Vec<_>>()));
            }
            records
        })
        .prop_shuffle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use artisync_core::{SortOutcome, TopologicalSorter};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn dags_sort(records in dag_strategy(30)) {
            prop_assert!(matches!(TopologicalSorter::sort(&records), SortOutcome::Ordered(_)));
        }

        #[test]
        fn cyclic_batches_are_rejected(records in cyclic_strategy(30)) {
            match TopologicalSorter::sort(&records) {
                SortOutcome::Cyclic(path) => {
                    prop_assert!(path.nodes().len() >= 2);
                    prop_assert_eq!(path.nodes().first(), path.nodes().last());
                }
                SortOutcome::Ordered(sorted) => prop_assert!(false, "ordered {:?}", sorted.order),
            }
        }

        #[test]
        fn names_are_nonempty(name in name_strategy()) {
            prop_assert!(!name.is_empty());
        }
    }
}
