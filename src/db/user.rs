//! User records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role flags a user can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May manage other users and their workers.
    Admin,
}

/// A persisted hub user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique login name.
    pub name: String,
    /// Role flags.
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl User {
    /// Create a user with no roles.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Create a user holding the admin role.
    pub fn admin(name: impl Into<String>) -> Self {
        Self::new(name).with_role(Role::Admin)
    }

    /// Add a role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Check for the admin role.
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
