//! # artisync Source
//!
//! Content source trait and implementations for artisync.
//!
//! This crate provides the lowest-level abstraction of the synchronization
//! engine: the place artifact definitions are read from. Sources are
//! **opaque byte stores** keyed by location - they do not interpret the
//! definitions they hold.
//!
//! ## Design Principles
//!
//! - Sources yield `(location, bytes)` pairs and answer existence checks
//! - No knowledge of artifact types, parsers, or lifecycle
//! - Must be `Send + Sync` so one source can feed several families
//! - Locations are `/`-separated and always start with `/`
//!
//! ## Available Sources
//!
//! - [`InMemorySource`] - For testing and programmatically registered content
//! - [`FileSystemSource`] - Walks a registry directory on disk
//! - [`LayeredSource`] - Merges predelivered content with a live registry
//!
//! ## Example
//!
//! ```rust
//! use artisync_source::{ContentSource, InMemorySource};
//!
//! let source = InMemorySource::new();
//! source.put("/security/admin.roles", b"[]".to_vec()).unwrap();
//!
//! let entries = source.list_candidates(&|loc: &str| loc.ends_with(".roles")).unwrap();
//! assert_eq!(entries.len(), 1);
//! assert!(source.exists("/security/admin.roles").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod layered;
mod memory;
mod source;

pub use error::{SourceError, SourceResult};
pub use file::FileSystemSource;
pub use layered::LayeredSource;
pub use memory::InMemorySource;
pub use source::{extension_of, normalize_location, ContentSource, SourceEntry};
