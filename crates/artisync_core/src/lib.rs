//! # artisync Core
//!
//! Artifact model, dependency resolution and depletion for artisync.
//!
//! This crate provides:
//! - The [`ArtifactRecord`] model and its [`Lifecycle`] state machine
//! - Change detection against the persisted snapshot
//! - The dependency resolver ([`TopologicalSorter`])
//! - The depletion worklist ([`Depleter`])
//! - The per-type [`Synchronizer`] contract
//! - The [`MetadataStore`] persistence boundary with in-memory and
//!   file-backed implementations
//!
//! ## Key Invariants
//!
//! - A record's key (`type:location:name`) is unique in a store
//! - A dependency cycle inside one batch is always reported, never broken
//! - A successfully applied record never returns to `New` unless its content
//!   hash changes
//! - One failing record never prevents unrelated records from advancing

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod error;
mod lifecycle;
pub mod store;
mod synchronizer;
pub mod topology;
mod types;

pub use artifact::ArtifactRecord;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use lifecycle::{detect_change, Change};
pub use store::{FileStore, InMemoryStore, MetadataStore};
pub use synchronizer::{accepts_extension, Synchronizer};
pub use topology::{
    CyclePath, Depleter, Depletion, Direction, Outcome, SortOutcome, Sorted, TopologicalSorter,
    TopologyNode, TopologyWrapper,
};
pub use types::{ArtifactId, ContentHash, Lifecycle, Phase};
