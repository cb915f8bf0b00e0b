//! Driver state machine, statistics and the per-family state log.

use crate::result::{PassResult, PassStatus};
use artisync_core::ErrorKind;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// What the driver is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No pass running.
    Idle,
    /// Listing, parsing and detecting changes.
    Collecting,
    /// Ordering the family batch.
    Resolving,
    /// Running create and update phases.
    Applying,
    /// Running the delete phase over orphans.
    Deleting,
    /// Removing the persisted state of deleted orphans.
    CleaningUp,
}

impl DriverState {
    /// Returns true while a pass is running.
    pub fn is_active(&self) -> bool {
        !matches!(self, DriverState::Idle)
    }
}

/// Cumulative statistics of a driver.
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    /// Passes that ran to completion (successful or failed).
    pub passes_run: u64,
    /// Passes that ended `Failed`.
    pub passes_failed: u64,
    /// Passes skipped because another pass held the lock.
    pub passes_skipped: u64,
    /// Passes that found the family disabled.
    pub passes_disabled: u64,
    /// Artifacts created or updated.
    pub artifacts_advanced: u64,
    /// Artifact failures.
    pub artifacts_failed: u64,
    /// Orphans removed.
    pub artifacts_deleted: u64,
    /// Last pass wall-clock start.
    pub last_pass_at: Option<SystemTime>,
    /// First diagnostic of the last failed pass.
    pub last_error: Option<String>,
}

impl PassStats {
    /// Folds a finished pass into the statistics.
    pub fn record(&mut self, result: &PassResult) {
        if result.status == PassStatus::Disabled {
            self.passes_disabled += 1;
            return;
        }
        if result.aborted && result.diagnostics_of(ErrorKind::Pass).next().is_some() {
            self.passes_skipped += 1;
            return;
        }
        self.passes_run += 1;
        if result.status == PassStatus::Failed {
            self.passes_failed += 1;
        }
        self.artifacts_advanced += result.advanced.len() as u64;
        self.artifacts_failed += result.failed.len() as u64;
        self.artifacts_deleted += result.deleted.len() as u64;
        self.last_pass_at = Some(result.started_at);
        self.last_error = result.diagnostics.first().map(ToString::to_string);
    }
}

/// Trigger and completion timestamps of one family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyState {
    /// Family name.
    pub name: String,
    /// First time a pass was triggered.
    pub first_triggered: Option<SystemTime>,
    /// Last time a pass was triggered.
    pub last_triggered: Option<SystemTime>,
    /// First time a pass finished.
    pub first_finished: Option<SystemTime>,
    /// Last time a pass finished.
    pub last_finished: Option<SystemTime>,
    /// Status of the last finished pass.
    pub last_status: Option<PassStatus>,
    /// Summary of the last finished pass.
    pub last_message: Option<String>,
}

/// One entry of the family state log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLogEntry {
    /// When the pass finished.
    pub at: SystemTime,
    /// Pass status.
    pub status: PassStatus,
    /// Pass summary.
    pub message: String,
}

/// Tracks [`FamilyState`] and a bounded, age-pruned state log.
#[derive(Debug)]
pub struct StateTracker {
    state: RwLock<FamilyState>,
    log: RwLock<VecDeque<StateLogEntry>>,
    retention: Duration,
    max_entries: usize,
}

impl StateTracker {
    /// Creates a tracker.
    pub fn new(name: impl Into<String>, retention: Duration, max_entries: usize) -> Self {
        Self {
            state: RwLock::new(FamilyState {
                name: name.into(),
                ..FamilyState::default()
            }),
            log: RwLock::new(VecDeque::new()),
            retention,
            max_entries,
        }
    }

    /// Returns a copy of the family state.
    pub fn state(&self) -> FamilyState {
        self.state.read().clone()
    }

    /// Returns a copy of the state log, oldest first.
    pub fn log(&self) -> Vec<StateLogEntry> {
        self.log.read().iter().cloned().collect()
    }

    /// Records a trigger at `now`.
    pub fn triggered(&self, now: SystemTime) {
        let mut state = self.state.write();
        state.first_triggered.get_or_insert(now);
        state.last_triggered = Some(now);
    }

    /// Records a finished pass at `now` and prunes the log.
    pub fn finished(&self, now: SystemTime, status: PassStatus, message: impl Into<String>) {
        let message = message.into();
        {
            let mut state = self.state.write();
            state.first_finished.get_or_insert(now);
            state.last_finished = Some(now);
            state.last_status = Some(status);
            state.last_message = Some(message.clone());
        }
        self.log.write().push_back(StateLogEntry {
            at: now,
            status,
            message,
        });
        self.prune(now);
    }

    /// Drops entries older than the retention and beyond the cap. Returns the
    /// number of entries removed.
    pub fn prune(&self, now: SystemTime) -> usize {
        let mut log = self.log.write();
        let before = log.len();
        while let Some(front) = log.front() {
            let expired = now
                .duration_since(front.at)
                .map(|age| age > self.retention)
                .unwrap_or(false);
            if expired || log.len() > self.max_entries {
                log.pop_front();
            } else {
                break;
            }
        }
        before - log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_state_activity() {
        assert!(!DriverState::Idle.is_active());
        assert!(DriverState::Applying.is_active());
        assert!(DriverState::CleaningUp.is_active());
    }

    #[test]
    fn tracker_timestamps() {
        let tracker = StateTracker::new("security", Duration::from_secs(3600), 10);
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let t1 = t0 + Duration::from_secs(5);

        tracker.triggered(t0);
        tracker.finished(t0, PassStatus::Successful, "ok");
        tracker.triggered(t1);
        tracker.finished(t1, PassStatus::Failed, "boom");

        let state = tracker.state();
        assert_eq!(state.name, "security");
        assert_eq!(state.first_triggered, Some(t0));
        assert_eq!(state.last_triggered, Some(t1));
        assert_eq!(state.first_finished, Some(t0));
        assert_eq!(state.last_status, Some(PassStatus::Failed));
        assert_eq!(state.last_message.as_deref(), Some("boom"));
        assert_eq!(tracker.log().len(), 2);
    }

    #[test]
    fn tracker_prunes_by_age() {
        let tracker = StateTracker::new("jobs", Duration::from_secs(3600), 100);
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        tracker.finished(t0, PassStatus::Successful, "old");
        tracker.finished(t0 + Duration::from_secs(1800), PassStatus::Successful, "mid");
        tracker.finished(t0 + Duration::from_secs(3700), PassStatus::Successful, "new");

        let log = tracker.log();
        let messages: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["mid", "new"]);
        assert_eq!(tracker.prune(t0 + Duration::from_secs(7200)), 1);
    }

    #[test]
    fn tracker_prunes_by_count() {
        let tracker = StateTracker::new("jobs", Duration::from_secs(3600), 2);
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        for i in 0..5 {
            tracker.finished(t0 + Duration::from_secs(i), PassStatus::Successful, format!("{i}"));
        }
        let log = tracker.log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "3");
    }

    #[test]
    fn stats_record_results() {
        let mut stats = PassStats::default();
        let mut ok = PassResult::new("f", false);
        ok.finish(Duration::ZERO);
        stats.record(&ok);

        let mut disabled = PassResult::new("f", false);
        disabled.status = PassStatus::Disabled;
        stats.record(&disabled);

        assert_eq!(stats.passes_run, 1);
        assert_eq!(stats.passes_disabled, 1);
        assert_eq!(stats.passes_failed, 0);
        assert!(stats.last_error.is_none());
    }
}
