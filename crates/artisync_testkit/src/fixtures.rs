//! Test fixtures: a scripted synchronizer, a flaky store and a family
//! builder.

use artisync_core::{
    accepts_extension, ArtifactRecord, ContentHash, CoreError, CoreResult, InMemoryStore,
    Lifecycle, MetadataStore, Phase, Synchronizer,
};
use artisync_engine::{
    FamilyConfig, PassObserver, ReconciliationDriver, Registry, SynchronizationPlugin,
};
use artisync_source::{ContentSource, InMemorySource};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One artifact in a scripted definition file.
///
/// Files hold a JSON array of these:
///
/// ```json
/// [{"name": "a", "dependsOn": ["b"]}, {"name": "b"}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedArtifact {
    /// Artifact name.
    pub name: String,
    /// Names this artifact depends on.
    #[serde(default, rename = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Extra attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// Creates a scripted artifact.
pub fn artifact(name: &str, depends_on: &[&str]) -> ScriptedArtifact {
    ScriptedArtifact {
        name: name.to_string(),
        depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        attributes: BTreeMap::new(),
    }
}

/// Serializes scripted artifacts into file content.
pub fn artifacts_json(artifacts: &[ScriptedArtifact]) -> Vec<u8> {
    serde_json::to_vec_pretty(artifacts).expect("scripted artifacts serialize")
}

/// One recorded `apply` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCall {
    /// Artifact name.
    pub name: String,
    /// Offered phase.
    pub phase: Phase,
    /// Lifecycle of the record when offered.
    pub lifecycle: Lifecycle,
    /// Whether the call returned `Ok(true)`.
    pub advanced: bool,
}

/// A synchronizer driven by JSON files, with fault injection and call logs.
///
/// A phase fits when [`Phase::fits`] says so; a fitting phase succeeds unless
/// the artifact was marked failing with [`fail_apply`](Self::fail_apply).
pub struct ScriptedSynchronizer {
    artifact_type: String,
    extension: String,
    store: Arc<dyn MetadataStore>,
    failing_apply: RwLock<HashSet<String>>,
    failing_cleanup: RwLock<HashSet<String>>,
    apply_delay: RwLock<Duration>,
    calls: Mutex<Vec<ApplyCall>>,
    cleanups: Mutex<Vec<String>>,
}

impl ScriptedSynchronizer {
    /// Creates a synchronizer for `artifact_type` accepting `.{extension}`
    /// files, backed by an in-memory store.
    pub fn new(artifact_type: &str, extension: &str) -> Arc<Self> {
        Self::with_store(artifact_type, extension, Arc::new(InMemoryStore::new()))
    }

    /// Creates a synchronizer backed by `store`.
    pub fn with_store(
        artifact_type: &str,
        extension: &str,
        store: Arc<dyn MetadataStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            artifact_type: artifact_type.to_string(),
            extension: extension.to_string(),
            store,
            failing_apply: RwLock::new(HashSet::new()),
            failing_cleanup: RwLock::new(HashSet::new()),
            apply_delay: RwLock::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            cleanups: Mutex::new(Vec::new()),
        })
    }

    /// Makes every fitting apply of `name` fail.
    pub fn fail_apply(&self, name: &str) {
        self.failing_apply.write().insert(name.to_string());
    }

    /// Makes cleanup of `name` fail.
    pub fn fail_cleanup(&self, name: &str) {
        self.failing_cleanup.write().insert(name.to_string());
    }

    /// Removes every injected fault for `name`.
    pub fn heal(&self, name: &str) {
        self.failing_apply.write().remove(name);
        self.failing_cleanup.write().remove(name);
    }

    /// Sleeps for `delay` inside every apply call.
    pub fn set_apply_delay(&self, delay: Duration) {
        *self.apply_delay.write() = delay;
    }

    /// Every apply call so far.
    pub fn calls(&self) -> Vec<ApplyCall> {
        self.calls.lock().clone()
    }

    /// Number of apply calls so far.
    pub fn apply_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Names of the artifacts advanced so far, in call order.
    pub fn applied_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.advanced)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Names of the artifacts cleaned up so far.
    pub fn cleanups(&self) -> Vec<String> {
        self.cleanups.lock().clone()
    }

    /// Number of cleanups of `name`.
    pub fn cleanup_count(&self, name: &str) -> usize {
        self.cleanups.lock().iter().filter(|n| *n == name).count()
    }

    /// Clears the call logs.
    pub fn reset_log(&self) {
        self.calls.lock().clear();
        self.cleanups.lock().clear();
    }

    /// Persisted record named `name`, if any.
    pub fn persisted(&self, name: &str) -> Option<ArtifactRecord> {
        self.store
            .find_all(&self.artifact_type)
            .ok()?
            .into_iter()
            .find(|r| r.name == name)
    }

    /// Persisted lifecycle of `name`, if any.
    pub fn lifecycle_of(&self, name: &str) -> Option<Lifecycle> {
        self.persisted(name).map(|r| r.lifecycle)
    }
}

impl Synchronizer for ScriptedSynchronizer {
    fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    fn accepts(&self, location: &str) -> bool {
        accepts_extension(location, &self.extension)
    }

    fn parse(&self, location: &str, content: &[u8]) -> CoreResult<Vec<ArtifactRecord>> {
        let artifacts: Vec<ScriptedArtifact> =
            serde_json::from_slice(content).map_err(|e| CoreError::parse(location, e))?;
        let hash = ContentHash::of(content);
        Ok(artifacts
            .into_iter()
            .map(|a| {
                let mut record =
                    ArtifactRecord::with_hash(&self.artifact_type, location, a.name, hash);
                record.dependencies.extend(a.depends_on);
                record.attributes = a.attributes;
                record
            })
            .collect())
    }

    fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    fn apply(&self, record: &ArtifactRecord, phase: Phase) -> CoreResult<bool> {
        let delay = *self.apply_delay.read();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let fits = phase.fits(record.lifecycle);
        let failing = fits && self.failing_apply.read().contains(&record.name);
        self.calls.lock().push(ApplyCall {
            name: record.name.clone(),
            phase,
            lifecycle: record.lifecycle,
            advanced: fits && !failing,
        });

        if failing {
            return Err(CoreError::apply(&record.location, phase, "scripted failure"));
        }
        Ok(fits)
    }

    fn cleanup(&self, record: &ArtifactRecord) -> CoreResult<()> {
        if self.failing_cleanup.read().contains(&record.name) {
            return Err(CoreError::persistence("scripted cleanup failure"));
        }
        self.store.delete(&record.key())?;
        self.cleanups.lock().push(record.name.clone());
        Ok(())
    }
}

/// A metadata store whose reads or writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    /// Creates a healthy store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Toggles read failures.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Toggles write failures.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> CoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CoreError::persistence(format!("injected {what} failure")))
        } else {
            Ok(())
        }
    }
}

impl MetadataStore for FlakyStore {
    fn find_by_key(&self, key: &str) -> CoreResult<Option<ArtifactRecord>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.find_by_key(key)
    }

    fn save(&self, record: &ArtifactRecord) -> CoreResult<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.save(record)
    }

    fn delete(&self, key: &str) -> CoreResult<bool> {
        self.check(&self.fail_writes, "write")?;
        self.inner.delete(key)
    }

    fn find_all(&self, artifact_type: &str) -> CoreResult<Vec<ArtifactRecord>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.find_all(artifact_type)
    }
}

/// A family over an in-memory source, for driving passes in tests.
pub struct TestFamily {
    config: FamilyConfig,
    source: Arc<InMemorySource>,
    synchronizers: Vec<(i32, Arc<dyn Synchronizer>)>,
    plugins: Vec<Arc<dyn SynchronizationPlugin>>,
}

impl TestFamily {
    /// Creates an enabled family with no synchronizers.
    pub fn new(name: &str) -> Self {
        Self {
            config: FamilyConfig::new(name),
            source: Arc::new(InMemorySource::new()),
            synchronizers: Vec::new(),
            plugins: Vec::new(),
        }
    }

    /// Registers a synchronizer.
    pub fn with_synchronizer(mut self, priority: i32, synchronizer: Arc<dyn Synchronizer>) -> Self {
        self.synchronizers.push((priority, synchronizer));
        self
    }

    /// Registers a plugin.
    pub fn with_plugin(mut self, plugin: Arc<dyn SynchronizationPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Replaces the family configuration.
    pub fn with_config(mut self, config: FamilyConfig) -> Self {
        self.config = config;
        self
    }

    /// The backing source.
    pub fn source(&self) -> Arc<InMemorySource> {
        Arc::clone(&self.source)
    }

    /// Writes a file.
    pub fn put(&self, location: &str, content: &[u8]) {
        self.source
            .put(location, content.to_vec())
            .expect("valid test location");
    }

    /// Writes scripted artifacts to a file.
    pub fn put_artifacts(&self, location: &str, artifacts: &[ScriptedArtifact]) {
        self.put(location, &artifacts_json(artifacts));
    }

    /// Removes a file.
    pub fn remove(&self, location: &str) {
        self.source.remove(location);
    }

    /// Builds the registry.
    pub fn registry(&self) -> Registry {
        let builder = self
            .synchronizers
            .iter()
            .fold(Registry::builder(), |b, (p, s)| b.with_synchronizer(*p, Arc::clone(s)));
        self.plugins
            .iter()
            .fold(builder, |b, p| b.with_plugin(Arc::clone(p)))
            .build()
    }

    /// Builds a driver over this family.
    pub fn driver(&self) -> ReconciliationDriver {
        let source: Arc<dyn ContentSource> = self.source();
        ReconciliationDriver::new(self.config.clone(), self.registry(), source)
    }

    /// Builds a driver with an observer.
    pub fn driver_with_observer(&self, observer: Arc<dyn PassObserver>) -> ReconciliationDriver {
        self.driver().with_observer(observer)
    }
}
