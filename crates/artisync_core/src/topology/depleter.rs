//! Depletion worklist.

use super::wrapper::{Outcome, TopologyWrapper};
use crate::error::{CoreError, CoreResult};
use crate::types::Phase;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Which neighbours must be completed before a wrapper is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Dependencies first (create, update).
    #[default]
    Forward,
    /// Dependents first (delete).
    Reverse,
}

/// Result of one depletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Depletion {
    /// Indices advanced by a phase, in application order.
    pub advanced: Vec<usize>,
    /// Indices completed as no-ops.
    pub skipped: Vec<usize>,
    /// Indices that failed during this depletion.
    pub failed: Vec<usize>,
    /// Number of full scans.
    pub scans: usize,
}

impl Depletion {
    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives wrappers through apply phases until no progress is made.
///
/// Each scan walks the pending wrappers in slice order. A ready wrapper is
/// offered every phase in turn:
///
/// - the first `Ok(true)` advances it
/// - `Ok(false)` from every phase completes it as a no-op
/// - an error fails it; it is not offered again in this depletion
///
/// When a scan completes nothing, the remaining pending wrappers fail with
/// [`CoreError::UnresolvedDependency`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Depleter {
    direction: Direction,
}

impl Depleter {
    /// Creates a depleter for dependency order.
    #[must_use]
    pub const fn forward() -> Self {
        Self {
            direction: Direction::Forward,
        }
    }

    /// Creates a depleter for reverse dependency order.
    #[must_use]
    pub const fn reverse() -> Self {
        Self {
            direction: Direction::Reverse,
        }
    }

    /// Returns the direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Depletes `wrappers`, calling `apply` for each offered phase.
    pub fn deplete<F>(
        &self,
        wrappers: &mut [TopologyWrapper],
        phases: &[Phase],
        mut apply: F,
    ) -> Depletion
    where
        F: FnMut(&TopologyWrapper, Phase) -> CoreResult<bool>,
    {
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(wrappers.len());
        for (i, w) in wrappers.iter().enumerate() {
            by_name.entry(w.record.name.clone()).or_insert(i);
        }

        // Indices this wrapper waits on, per direction.
        let mut waits_on: Vec<Vec<usize>> = vec![Vec::new(); wrappers.len()];
        for (i, w) in wrappers.iter().enumerate() {
            for dep in &w.record.dependencies {
                let Some(&target) = by_name.get(dep) else {
                    continue;
                };
                if target == i {
                    continue;
                }
                match self.direction {
                    Direction::Forward => waits_on[i].push(target),
                    Direction::Reverse => waits_on[target].push(i),
                }
            }
        }

        let mut depletion = Depletion::default();
        loop {
            depletion.scans += 1;
            let mut progressed = false;

            for i in 0..wrappers.len() {
                if !wrappers[i].is_pending() {
                    continue;
                }
                if !waits_on[i].iter().all(|&j| wrappers[j].completed) {
                    continue;
                }

                let mut result = Ok(None);
                for &phase in phases {
                    match apply(&wrappers[i], phase) {
                        Ok(true) => {
                            result = Ok(Some(phase));
                            break;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }

                let wrapper = &mut wrappers[i];
                match result {
                    Ok(Some(phase)) => {
                        trace!(name = %wrapper.record.name, %phase, "advanced");
                        wrapper.completed = true;
                        wrapper.outcome = Outcome::Advanced(phase);
                        depletion.advanced.push(i);
                        progressed = true;
                    }
                    Ok(None) => {
                        trace!(name = %wrapper.record.name, "no phase applies");
                        wrapper.completed = true;
                        wrapper.outcome = Outcome::Skipped;
                        depletion.skipped.push(i);
                        progressed = true;
                    }
                    Err(e) => {
                        debug!(name = %wrapper.record.name, error = %e, "apply failed");
                        wrapper.outcome = Outcome::Failed;
                        wrapper.error = Some(e);
                        depletion.failed.push(i);
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        for i in 0..wrappers.len() {
            if !wrappers[i].is_pending() {
                continue;
            }
            let missing: Vec<String> = waits_on[i]
                .iter()
                .filter(|&&j| !wrappers[j].completed)
                .map(|&j| wrappers[j].record.name.clone())
                .collect();
            let wrapper = &mut wrappers[i];
            debug!(name = %wrapper.record.name, ?missing, "undepleted artifact");
            wrapper.outcome = Outcome::Failed;
            wrapper.error = Some(CoreError::UnresolvedDependency {
                name: wrapper.record.name.clone(),
                missing,
            });
            depletion.failed.push(i);
        }

        depletion
    }
}
