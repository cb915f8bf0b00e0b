//! The reconciliation driver.

use crate::config::FamilyConfig;
use crate::error::{EngineError, EngineResult};
use crate::observer::{NoopObserver, PassObserver, StateChange};
use crate::registry::Registry;
use crate::result::{ArtifactRef, Diagnostic, PassResult, PassStatus};
use crate::state::{DriverState, FamilyState, PassStats, StateLogEntry, StateTracker};
use artisync_core::{
    detect_change, ArtifactRecord, CoreError, Depleter, ErrorKind, Lifecycle, Outcome, Phase,
    SortOutcome, Synchronizer, TopologicalSorter, TopologyWrapper,
};
use artisync_source::ContentSource;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, info_span, warn};

/// Orchestrates reconciliation passes for one family.
///
/// A pass lists the candidates of every registered synchronizer, detects
/// lifecycle changes against the persisted snapshot, orders the batch by
/// dependencies, applies create and update phases, deletes orphans in reverse
/// dependency order, cleans them up and finally runs the registry's plugins.
///
/// Only one pass runs at a time per driver. A pass that finds the lock held
/// is skipped and reported `Failed`; it is never queued.
///
/// # Example
///
/// ```rust,ignore
/// let driver = ReconciliationDriver::new(FamilyConfig::new("security"), registry, source)
///     .with_observer(Arc::new(TracingObserver));
/// let result = driver.synchronize();
/// assert!(result.is_successful());
/// ```
pub struct ReconciliationDriver {
    config: FamilyConfig,
    registry: Registry,
    source: Arc<dyn ContentSource>,
    observer: Arc<dyn PassObserver>,
    pass_lock: Mutex<()>,
    enabled: AtomicBool,
    state: RwLock<DriverState>,
    stats: RwLock<PassStats>,
    tracker: StateTracker,
}

/// Everything collected for one family batch before ordering.
#[derive(Default)]
struct Collected {
    wrappers: Vec<TopologyWrapper>,
    seen_keys: HashSet<String>,
    unparsed_locations: HashSet<(usize, String)>,
}

impl ReconciliationDriver {
    /// Creates a driver.
    pub fn new(config: FamilyConfig, registry: Registry, source: Arc<dyn ContentSource>) -> Self {
        let tracker = StateTracker::new(
            config.name.clone(),
            config.state_log_retention,
            config.max_state_log_entries,
        );
        Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            registry,
            source,
            observer: Arc::new(NoopObserver),
            pass_lock: Mutex::new(()),
            state: RwLock::new(DriverState::Idle),
            stats: RwLock::new(PassStats::default()),
            tracker,
        }
    }

    /// Sets the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PassObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Family name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Family configuration.
    pub fn config(&self) -> &FamilyConfig {
        &self.config
    }

    /// The registry this driver runs.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Enables unforced passes.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Disables unforced passes. Forced passes still run.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Returns true if unforced passes run.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Current driver state.
    pub fn state(&self) -> DriverState {
        *self.state.read()
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> PassStats {
        self.stats.read().clone()
    }

    /// Trigger and completion timestamps.
    pub fn family_state(&self) -> FamilyState {
        self.tracker.state()
    }

    /// State log, oldest first.
    pub fn state_log(&self) -> Vec<StateLogEntry> {
        self.tracker.log()
    }

    /// Runs a pass unless the family is disabled.
    pub fn synchronize(&self) -> PassResult {
        self.run_pass(false)
    }

    /// Runs a pass even if the family is disabled.
    pub fn force_synchronize(&self) -> PassResult {
        self.run_pass(true)
    }

    fn set_state(&self, state: DriverState) {
        *self.state.write() = state;
    }

    fn run_pass(&self, forced: bool) -> PassResult {
        let started = Instant::now();
        let mut result = PassResult::new(self.config.name.clone(), forced);

        let Some(_guard) = self.pass_lock.try_lock() else {
            let err = EngineError::PassInProgress {
                family: self.config.name.clone(),
            };
            debug!(family = %self.config.name, "pass skipped, another pass holds the lock");
            result.abort(err.kind(), err.to_string());
            return self.complete(result, started, false);
        };

        if !forced && !self.is_enabled() {
            debug!(family = %self.config.name, "family disabled");
            result.status = PassStatus::Disabled;
            return self.complete(result, started, false);
        }

        let span = info_span!("pass", family = %self.config.name, forced);
        let _enter = span.enter();
        self.tracker.triggered(SystemTime::now());

        if let Err(e) = self.execute(&mut result) {
            warn!(error = %e, "pass aborted");
            result.abort(e.kind(), e.to_string());
        }
        self.set_state(DriverState::Idle);
        self.complete(result, started, true)
    }

    fn complete(&self, mut result: PassResult, started: Instant, tracked: bool) -> PassResult {
        result.finish(started.elapsed());
        self.stats.write().record(&result);
        if tracked {
            self.tracker
                .finished(SystemTime::now(), result.status, result.summary());
        }
        self.observer.on_pass_result(&result);
        result
    }

    fn execute(&self, result: &mut PassResult) -> EngineResult<()> {
        self.set_state(DriverState::Collecting);
        let collected = self.collect(result)?;
        let seen_keys = collected.seen_keys;
        let unparsed = collected.unparsed_locations;

        self.set_state(DriverState::Resolving);
        let mut wrappers = self.resolve(collected.wrappers, result);

        self.set_state(DriverState::Applying);
        self.apply(&mut wrappers, result);

        self.set_state(DriverState::Deleting);
        self.delete_orphans(&seen_keys, &unparsed, result);

        for plugin in self.registry.plugins() {
            if let Err(e) = plugin.run(result) {
                warn!(plugin = plugin.name(), error = %e, "plugin failed");
                result
                    .diagnostics
                    .push(Diagnostic::pass_level(ErrorKind::Plugin, e.to_string()));
            }
        }
        Ok(())
    }

    fn synchronizer(&self, index: usize) -> &dyn Synchronizer {
        self.registry.synchronizers()[index].as_ref()
    }

    fn notify(&self, sync: &dyn Synchronizer, record: &ArtifactRecord, from: Option<Lifecycle>) {
        self.observer.on_state_change(&StateChange {
            family: self.config.name.clone(),
            synchronizer: sync.id().to_string(),
            location: record.location.clone(),
            name: record.name.clone(),
            from,
            to: record.lifecycle,
            error: record.last_error.clone(),
        });
    }

    fn report_failure(
        &self,
        sync: &dyn Synchronizer,
        record: &ArtifactRecord,
        error: &CoreError,
        result: &mut PassResult,
    ) {
        result
            .diagnostics
            .push(Diagnostic::from_error(sync.id(), &record.location, error));
        result.failed.push(ArtifactRef::of(sync.id(), record));
    }

    /// Lists, parses and detects changes for every synchronizer.
    fn collect(&self, result: &mut PassResult) -> EngineResult<Collected> {
        let mut collected = Collected::default();
        let mut names: HashMap<String, String> = HashMap::new();

        for (index, sync) in self.registry.synchronizers().iter().enumerate() {
            let sync = sync.as_ref();
            let entries = self.source.list_candidates(&|location: &str| sync.accepts(location))?;
            debug!(synchronizer = sync.id(), candidates = entries.len(), "collected");

            for entry in entries {
                let records = match sync.parse(&entry.location, &entry.content) {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(synchronizer = sync.id(), location = %entry.location, error = %e, "parse failed");
                        result
                            .diagnostics
                            .push(Diagnostic::from_error(sync.id(), &entry.location, &e));
                        collected
                            .unparsed_locations
                            .insert((index, entry.location.clone()));
                        continue;
                    }
                };

                for record in records {
                    collected.seen_keys.insert(record.key());
                    if let Some(existing) = names.get(&record.name) {
                        let err = CoreError::DuplicateArtifact {
                            name: record.name.clone(),
                            location: record.location.clone(),
                            existing: existing.clone(),
                        };
                        self.report_failure(sync, &record, &err, result);
                        continue;
                    }
                    names.insert(record.name.clone(), record.location.clone());

                    collected.wrappers.push(self.detect(index, sync, record));
                }
            }
        }
        Ok(collected)
    }

    /// Compares a fresh record with its persisted copy and upserts it.
    ///
    /// A record whose persisted state cannot be read or written stays in the
    /// batch detached, so its dependents are held back.
    fn detect(
        &self,
        index: usize,
        sync: &dyn Synchronizer,
        mut record: ArtifactRecord,
    ) -> TopologyWrapper {
        let persisted = match sync.find_persisted(&record) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(synchronizer = sync.id(), name = %record.name, error = %e, "cannot load persisted artifact");
                return TopologyWrapper::detached(record, index, e);
            }
        };

        let change = detect_change(persisted.as_ref(), &record.content_hash);
        if let Some(persisted) = &persisted {
            record.id = persisted.id;
            record.applied_hash = persisted.applied_hash;
            if !change.requires_apply {
                record.last_error = persisted.last_error.clone();
            }
        }
        record.lifecycle = change.to;

        if !change.requires_apply {
            return TopologyWrapper::unchanged(record, index);
        }

        if let Err(e) = sync.upsert(&mut record) {
            warn!(synchronizer = sync.id(), name = %record.name, error = %e, "cannot persist artifact");
            return TopologyWrapper::detached(record, index, e);
        }
        if change.is_transition() {
            self.notify(sync, &record, change.from);
        }
        TopologyWrapper::new(record, index)
    }

    /// Orders the batch. Every cycle blocks all records of the synchronizer
    /// types on it; the remaining records are sorted again.
    fn resolve(
        &self,
        mut wrappers: Vec<TopologyWrapper>,
        result: &mut PassResult,
    ) -> Vec<TopologyWrapper> {
        let all_names: HashSet<String> = wrappers.iter().map(|w| w.record.name.clone()).collect();

        loop {
            let candidates: Vec<usize> = (0..wrappers.len())
                .filter(|&i| !wrappers[i].is_failed())
                .collect();
            let nodes: Vec<&TopologyWrapper> = candidates.iter().map(|&i| &wrappers[i]).collect();
            let outcome = TopologicalSorter::sort(&nodes);
            drop(nodes);

            match outcome {
                SortOutcome::Ordered(sorted) => {
                    let mut slots: Vec<Option<TopologyWrapper>> =
                        wrappers.into_iter().map(Some).collect();
                    let mut ordered = Vec::with_capacity(slots.len());

                    for &k in &sorted.indices {
                        let Some(mut wrapper) = slots[candidates[k]].take() else {
                            continue;
                        };
                        wrapper.external = sorted.external_by_node[k]
                            .iter()
                            .filter(|name| !all_names.contains(*name))
                            .cloned()
                            .collect();
                        if !wrapper.external.is_empty() {
                            debug!(name = %wrapper.record.name, external = ?wrapper.external, "external dependencies");
                            result
                                .external
                                .insert(wrapper.record.name.clone(), wrapper.external.clone());
                        }
                        ordered.push(wrapper);
                    }
                    ordered.extend(slots.into_iter().flatten());
                    return ordered;
                }
                SortOutcome::Cyclic(path) => {
                    let types: BTreeSet<usize> = wrappers
                        .iter()
                        .filter(|w| path.contains(&w.record.name))
                        .map(|w| w.synchronizer)
                        .collect();
                    warn!(cycle = %path, "cyclic dependency, blocking {} synchronizer(s)", types.len());

                    for wrapper in wrappers.iter_mut() {
                        if types.contains(&wrapper.synchronizer) && !wrapper.is_failed() {
                            wrapper.block(CoreError::CyclicDependency { path: path.clone() });
                        }
                    }
                }
            }
        }
    }

    /// Runs create and update phases and records per-artifact outcomes.
    fn apply(&self, wrappers: &mut [TopologyWrapper], result: &mut PassResult) {
        let depletion = Depleter::forward().deplete(
            wrappers,
            &[Phase::Create, Phase::Update],
            |wrapper, phase| self.synchronizer(wrapper.synchronizer).apply(&wrapper.record, phase),
        );
        debug!(
            advanced = depletion.advanced.len(),
            failed = depletion.failed.len(),
            scans = depletion.scans,
            "depleted"
        );

        // Report advanced records in application order, then everything else.
        let mut order = depletion.advanced.clone();
        let advanced: HashSet<usize> = order.iter().copied().collect();
        order.extend((0..wrappers.len()).filter(|i| !advanced.contains(i)));

        for i in order {
            let wrapper = &mut wrappers[i];
            let sync = self.synchronizer(wrapper.synchronizer);
            let from = wrapper.record.lifecycle;
            let reference = ArtifactRef::of(sync.id(), &wrapper.record);

            match wrapper.outcome {
                Outcome::Advanced(phase) => {
                    match sync.set_status(&mut wrapper.record, phase.target(), None) {
                        Ok(()) => {
                            self.notify(sync, &wrapper.record, Some(from));
                            result.advanced.push(reference);
                        }
                        Err(e) => self.report_failure(sync, &wrapper.record, &e, result),
                    }
                }
                Outcome::Skipped => result.skipped.push(reference),
                Outcome::Unchanged => result.unchanged.push(reference),
                Outcome::Failed | Outcome::Pending => {
                    let error = wrapper.error.take().unwrap_or_else(|| {
                        CoreError::UnresolvedDependency {
                            name: wrapper.record.name.clone(),
                            missing: Vec::new(),
                        }
                    });
                    if !wrapper.detached {
                        let message = error.to_string();
                        if let Err(e) =
                            sync.set_status(&mut wrapper.record, Lifecycle::Failed, Some(message))
                        {
                            warn!(name = %wrapper.record.name, error = %e, "cannot persist failure");
                        }
                        self.notify(sync, &wrapper.record, Some(from));
                    }
                    self.report_failure(sync, &wrapper.record, &error, result);
                }
            }
        }
    }

    /// Deletes orphans in reverse dependency order and cleans them up.
    fn delete_orphans(
        &self,
        seen_keys: &HashSet<String>,
        unparsed: &HashSet<(usize, String)>,
        result: &mut PassResult,
    ) {
        let mut orphans = Vec::new();
        for (index, sync) in self.registry.synchronizers().iter().enumerate() {
            let persisted = match sync.list_persisted() {
                Ok(persisted) => persisted,
                Err(e) => {
                    warn!(synchronizer = sync.id(), error = %e, "cannot list persisted artifacts");
                    result
                        .diagnostics
                        .push(Diagnostic::pass_level(e.kind(), e.to_string()));
                    continue;
                }
            };
            for record in persisted {
                if seen_keys.contains(&record.key())
                    || unparsed.contains(&(index, record.location.clone()))
                    || record.lifecycle.is_terminal()
                {
                    continue;
                }
                orphans.push(TopologyWrapper::new(record, index));
            }
        }
        if orphans.is_empty() {
            return;
        }
        info!(orphans = orphans.len(), "deleting orphans");

        let depletion = Depleter::reverse().deplete(&mut orphans, &[Phase::Delete], |wrapper, phase| {
            self.synchronizer(wrapper.synchronizer)
                .apply(&wrapper.record, phase)
        });

        let mut order = depletion.advanced.clone();
        let deleted: HashSet<usize> = order.iter().copied().collect();
        order.extend((0..orphans.len()).filter(|i| !deleted.contains(i)));

        self.set_state(DriverState::CleaningUp);
        for i in order {
            let wrapper = &mut orphans[i];
            let sync = self.synchronizer(wrapper.synchronizer);
            let from = wrapper.record.lifecycle;

            match wrapper.outcome {
                Outcome::Advanced(_) | Outcome::Skipped => {
                    if let Err(e) = sync.cleanup(&wrapper.record) {
                        self.report_failure(sync, &wrapper.record, &e, result);
                        continue;
                    }
                    wrapper.record.lifecycle = Lifecycle::Deleted;
                    wrapper.record.last_error = None;
                    self.notify(sync, &wrapper.record, Some(from));
                    result.deleted.push(ArtifactRef::of(sync.id(), &wrapper.record));
                }
                _ => {
                    let error = wrapper.error.take().unwrap_or_else(|| {
                        CoreError::UnresolvedDependency {
                            name: wrapper.record.name.clone(),
                            missing: Vec::new(),
                        }
                    });
                    if let Err(e) =
                        sync.set_status(&mut wrapper.record, Lifecycle::Failed, Some(error.to_string()))
                    {
                        warn!(name = %wrapper.record.name, error = %e, "cannot persist failure");
                    }
                    self.notify(sync, &wrapper.record, Some(from));
                    self.report_failure(sync, &wrapper.record, &error, result);
                }
            }
        }
    }
}

impl std::fmt::Debug for ReconciliationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationDriver")
            .field("family", &self.config.name)
            .field("registry", &self.registry)
            .field("enabled", &self.is_enabled())
            .field("state", &self.state())
            .finish()
    }
}
