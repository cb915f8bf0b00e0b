//! # artisync Testkit
//!
//! Test utilities for artisync.
//!
//! This crate provides:
//! - A scripted synchronizer with fault injection and call logs
//! - A test family builder over an in-memory source
//! - A metadata store that can be made to fail
//! - Property-based generators for dependency graphs
//! - Tracing setup for tests and benches
//!
//! ## Usage
//!
//! ```rust,ignore
//! use artisync_testkit::prelude::*;
//!
//! #[test]
//! fn chain_is_applied_in_order() {
//!     let jobs = ScriptedSynchronizer::new("job", "job");
//!     let family = TestFamily::new("jobs").with_synchronizer(0, jobs.clone());
//!     family.put_artifacts("/a.job", &[artifact("a", &["b"]), artifact("b", &[])]);
//!     family.driver().synchronize();
//!     assert_eq!(jobs.applied_names(), vec!["b", "a"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
}

pub use fixtures::*;
pub use generators::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a `tracing` fmt subscriber for tests.
///
/// The filter comes from `RUST_LOG`, defaulting to `warn`. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
