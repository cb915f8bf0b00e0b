//! Resolver and depleter working together.

use artisync_core::{
    ArtifactRecord, CoreError, Depleter, Outcome, Phase, SortOutcome, TopologicalSorter,
    TopologyWrapper,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn record(name: &str, deps: &[String]) -> ArtifactRecord {
    deps.iter().fold(
        ArtifactRecord::new("job", format!("/{name}.job"), name, name.as_bytes()),
        |r, d| r.with_dependency(d.clone()),
    )
}

/// Random DAG: node `i` may only depend on nodes with a lower index.
fn dag() -> impl Strategy<Value = Vec<ArtifactRecord>> {
    (1usize..25).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), n)
            .prop_map(move |picks| {
                picks
                    .iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let deps: Vec<String> = if i == 0 {
                            Vec::new()
                        } else {
                            deps.iter().map(|d| format!("n{}", d.index(i))).collect()
                        };
                        record(&format!("n{i}"), &deps)
                    })
                    .rev()
                    .collect()
            })
    })
}

#[test]
fn sorted_batch_depletes_in_dependency_order() {
    let records = vec![
        record("a", &["b".into()]),
        record("b", &["c".into()]),
        record("c", &[]),
    ];
    let sorted = TopologicalSorter::sort(&records).into_result().unwrap();
    let mut wrappers: Vec<_> = sorted
        .indices
        .iter()
        .map(|&i| TopologyWrapper::new(records[i].clone(), 0))
        .collect();

    let mut applied = Vec::new();
    let depletion = Depleter::forward().deplete(&mut wrappers, &[Phase::Create], |w, _| {
        applied.push(w.record.name.clone());
        Ok(true)
    });
    assert_eq!(applied, vec!["c", "b", "a"]);
    assert!(depletion.is_clean());
}

#[test]
fn cyclic_batch_is_rejected_whole() {
    let records = vec![
        record("free", &[]),
        record("x", &["y".into()]),
        record("y", &["z".into()]),
        record("z", &["x".into()]),
    ];
    match TopologicalSorter::sort(&records) {
        SortOutcome::Cyclic(path) => {
            assert_eq!(path.nodes().first(), path.nodes().last());
            assert_eq!(path.nodes().len(), 4);
        }
        SortOutcome::Ordered(sorted) => panic!("unexpected order {:?}", sorted.order),
    }
}

#[test]
fn failure_isolation_in_wide_batch() {
    let records: Vec<_> = (0..10).map(|i| record(&format!("n{i}"), &[])).collect();
    let mut wrappers: Vec<_> = records
        .into_iter()
        .map(|r| TopologyWrapper::new(r, 0))
        .collect();
    let depletion = Depleter::forward().deplete(&mut wrappers, &[Phase::Create], |w, p| {
        if w.record.name == "n4" {
            Err(CoreError::apply(w.record.location.clone(), p, "refused"))
        } else {
            Ok(true)
        }
    });
    assert_eq!(depletion.advanced.len(), 9);
    assert_eq!(depletion.failed, vec![4]);
    assert_eq!(wrappers[4].outcome, Outcome::Failed);
}

proptest! {
    #[test]
    fn dag_depletes_completely_and_in_order(records in dag()) {
        let sorted = TopologicalSorter::sort(&records).into_result().unwrap();
        prop_assert!(sorted.external.is_empty());

        let mut wrappers: Vec<_> = sorted
            .indices
            .iter()
            .map(|&i| TopologyWrapper::new(records[i].clone(), 0))
            .collect();
        let mut done: HashSet<String> = HashSet::new();
        let mut violations = 0;
        let depletion = Depleter::forward().deplete(&mut wrappers, &[Phase::Create], |w, _| {
            if !w.record.dependencies.iter().all(|d| done.contains(d)) {
                violations += 1;
            }
            done.insert(w.record.name.clone());
            Ok(true)
        });

        prop_assert_eq!(violations, 0);
        prop_assert_eq!(depletion.advanced.len(), records.len());
        // Sorted input needs one productive scan plus the final empty one.
        prop_assert_eq!(depletion.scans, 2);
    }

    #[test]
    fn reverse_depletion_removes_dependents_first(records in dag()) {
        let mut wrappers: Vec<_> = records
            .iter()
            .map(|r| TopologyWrapper::new(r.clone(), 0))
            .collect();
        let mut removed: HashSet<String> = HashSet::new();
        let mut violations = 0;
        let all = records.clone();
        let depletion = Depleter::reverse().deplete(&mut wrappers, &[Phase::Delete], |w, _| {
            let dependents_left = all
                .iter()
                .filter(|r| r.dependencies.contains(&w.record.name))
                .any(|r| !removed.contains(&r.name));
            if dependents_left {
                violations += 1;
            }
            removed.insert(w.record.name.clone());
            Ok(true)
        });
        prop_assert_eq!(violations, 0);
        prop_assert!(depletion.is_clean());
    }
}
