//! # artisync Security
//!
//! Security roles and access constraints reconciled as one artisync family.
//!
//! - `.roles` files hold a JSON array of `{name, description}`
//! - `.access` files hold a JSON array of
//!   `{name?, scope, path, method, roles[], description}`
//!
//! Each access constraint depends on the roles it grants. Applying registers
//! roles and constraints in a [`SecurityRegistry`]; deleting an orphan
//! revokes it.
//!
//! ```rust,ignore
//! let family = SecurityFamily::in_memory();
//! let driver = family.driver(FamilyConfig::new("security"), source);
//! driver.synchronize();
//! assert!(family.security().is_allowed("/orders/1", "GET", &["admin"]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod family;
mod model;
mod registry;
mod roles;

pub use access::AccessSynchronizer;
pub use family::{SecurityFamily, ACCESS_PRIORITY, ROLE_PRIORITY};
pub use model::{
    AccessDefinition, RoleDefinition, ACCESS_EXTENSION, ACCESS_TYPE, ROLE_EXTENSION, ROLE_TYPE,
};
pub use registry::{Constraint, Role, SecurityRegistry};
pub use roles::RoleSynchronizer;
