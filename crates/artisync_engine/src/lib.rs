//! # artisync Engine
//!
//! Reconciliation driver, orchestration registry and scheduler for artisync.
//!
//! This crate provides:
//! - The [`ReconciliationDriver`] running one family's passes
//! - The [`Registry`] of synchronizers and pass plugins
//! - Pass observers (tracing, channel, no-op)
//! - Per-family state tracking with a pruned state log
//! - A [`PeriodicScheduler`] with one worker thread per family
//!
//! ## Pass
//!
//! 1. Try the family's pass lock (skip the pass if held)
//! 2. Check the enabled flag (unless forced)
//! 3. Collect, parse and detect changes per synchronizer
//! 4. Resolve dependencies, isolating cyclic synchronizer types
//! 5. Deplete create and update phases
//! 6. Delete orphans in reverse dependency order and clean them up
//! 7. Run plugins and emit the [`PassResult`]
//!
//! ## Key Invariants
//!
//! - At most one pass per driver runs at a time
//! - Per-artifact errors never abort a pass
//! - Orphans are cleaned up exactly once
//! - An unchanged source produces no apply calls

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod observer;
mod registry;
mod result;
mod scheduler;
mod state;

pub use config::{
    FamilyConfig, SchedulerConfig, DEFAULT_MAX_STATE_LOG_ENTRIES, DEFAULT_STATE_LOG_RETENTION,
};
pub use driver::ReconciliationDriver;
pub use error::{EngineError, EngineResult};
pub use observer::{ChannelObserver, NoopObserver, PassEvent, PassObserver, StateChange, TracingObserver};
pub use registry::{Registry, RegistryBuilder, SynchronizationPlugin};
pub use result::{ArtifactRef, Diagnostic, PassResult, PassStatus};
pub use scheduler::{run_all, PeriodicScheduler};
pub use state::{DriverState, FamilyState, PassStats, StateLogEntry, StateTracker};
