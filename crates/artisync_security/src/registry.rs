//! Runtime registry of active roles and access constraints.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// An active role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Defining location.
    pub location: String,
}

/// An active access constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Constraint name.
    pub name: String,
    /// Protected scope.
    pub scope: String,
    /// Protected path, optionally ending in `*`.
    pub path: String,
    /// HTTP method or `*`.
    pub method: String,
    /// Roles granted access.
    pub roles: BTreeSet<String>,
    /// Defining location.
    pub location: String,
}

impl Constraint {
    /// Returns true if this constraint covers `path` and `method`.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        let path_matches = match self.path.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => self.path == path,
        };
        path_matches && (self.method == "*" || self.method.eq_ignore_ascii_case(method))
    }
}

/// Holds the roles and constraints applied by the security family.
///
/// Shared between the synchronizers (writers) and request handling (readers).
#[derive(Debug, Default)]
pub struct SecurityRegistry {
    roles: RwLock<BTreeMap<String, Role>>,
    constraints: RwLock<BTreeMap<String, Constraint>>,
}

impl SecurityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a role.
    pub fn register_role(&self, role: Role) {
        self.roles.write().insert(role.name.clone(), role);
    }

    /// Removes a role. Returns true if it was registered.
    pub fn revoke_role(&self, name: &str) -> bool {
        self.roles.write().remove(name).is_some()
    }

    /// Removes a role only if it is still defined at `location`.
    ///
    /// A role that moved to another file keeps its newer registration.
    pub fn revoke_role_at(&self, name: &str, location: &str) -> bool {
        let mut roles = self.roles.write();
        if roles.get(name).is_some_and(|r| r.location == location) {
            roles.remove(name);
            true
        } else {
            false
        }
    }

    /// Registers or replaces a constraint.
    pub fn register_constraint(&self, constraint: Constraint) {
        self.constraints
            .write()
            .insert(constraint.name.clone(), constraint);
    }

    /// Removes a constraint. Returns true if it was registered.
    pub fn revoke_constraint(&self, name: &str) -> bool {
        self.constraints.write().remove(name).is_some()
    }

    /// Removes a constraint only if it is still defined at `location`.
    pub fn revoke_constraint_at(&self, name: &str, location: &str) -> bool {
        let mut constraints = self.constraints.write();
        if constraints.get(name).is_some_and(|c| c.location == location) {
            constraints.remove(name);
            true
        } else {
            false
        }
    }

    /// Returns a registered role.
    pub fn role(&self, name: &str) -> Option<Role> {
        self.roles.read().get(name).cloned()
    }

    /// Returns a registered constraint.
    pub fn constraint(&self, name: &str) -> Option<Constraint> {
        self.constraints.read().get(name).cloned()
    }

    /// Names of the registered roles.
    pub fn role_names(&self) -> Vec<String> {
        self.roles.read().keys().cloned().collect()
    }

    /// Names of the registered constraints.
    pub fn constraint_names(&self) -> Vec<String> {
        self.constraints.read().keys().cloned().collect()
    }

    /// Decides whether a caller holding `roles` may access `path` with
    /// `method`.
    ///
    /// Unconstrained paths are open. A constrained path requires at least one
    /// granted role that is currently registered.
    pub fn is_allowed(&self, path: &str, method: &str, roles: &[&str]) -> bool {
        let constraints = self.constraints.read();
        let registered = self.roles.read();
        let mut matching = constraints
            .values()
            .filter(|c| c.matches(path, method))
            .peekable();
        if matching.peek().is_none() {
            return true;
        }
        matching.any(|c| {
            roles
                .iter()
                .any(|r| c.roles.contains(*r) && registered.contains_key(*r))
        })
    }
}
