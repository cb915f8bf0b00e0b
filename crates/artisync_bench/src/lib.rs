//! Benchmark utilities.

use artisync_core::{ArtifactRecord, TopologyWrapper};
use artisync_testkit::{artifact, ScriptedArtifact};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Generate a shuffled random DAG of `count` job records.
///
/// Node `i` depends on up to `max_deps` nodes with a lower index.
pub fn random_dag(count: usize, max_deps: usize) -> Vec<ArtifactRecord> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    let mut records: Vec<_> = (0..count)
        .map(|i| {
            let deps = if i == 0 { 0 } else { rng.gen_range(0..=max_deps) };
            (0..deps).fold(
                ArtifactRecord::new("job", format!("/n{i}.job"), format!("n{i}"), &i.to_le_bytes()),
                |record, _| record.with_dependency(format!("n{}", rng.gen_range(0..i))),
            )
        })
        .collect();
    records.shuffle(&mut rng);
    records
}

/// Generate a linear chain `n0 <- n1 <- ... <- n{count-1}`.
pub fn chain(count: usize) -> Vec<ArtifactRecord> {
    (0..count)
        .map(|i| {
            let record = ArtifactRecord::new("job", "/chain.job", format!("n{i}"), b"chain");
            if i == 0 {
                record
            } else {
                record.with_dependency(format!("n{}", i - 1))
            }
        })
        .collect()
}

/// Wrap records for depletion.
pub fn wrappers(records: &[ArtifactRecord]) -> Vec<TopologyWrapper> {
    records
        .iter()
        .cloned()
        .map(|r| TopologyWrapper::new(r, 0))
        .collect()
}

/// Scripted artifacts for a family pass, spread over `files` files.
pub fn scripted_files(count: usize, files: usize) -> Vec<Vec<ScriptedArtifact>> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut out = vec![Vec::new(); files.max(1)];
    for i in 0..count {
        let deps: Vec<String> = if i == 0 {
            Vec::new()
        } else {
            (0..rng.gen_range(0..3usize))
                .map(|_| format!("n{}", rng.gen_range(0..i)))
                .collect()
        };
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        let slot = i % out.len();
        out[slot].push(artifact(&format!("n{i}"), &deps));
    }
    out
}
