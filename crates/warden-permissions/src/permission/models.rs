//! Permission data models

use serde::{Deserialize, Serialize};

/// Outcome of resolving a node against a database or a context graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionResult {
    /// The node is explicitly granted
    Allow,
    /// The node is explicitly revoked
    Deny,
    /// No opinion was expressed; resolution continues with parent contexts
    #[default]
    Default,
}

impl PermissionResult {
    /// Collapse to a boolean, treating `Default` as not granted
    pub fn is_allowed(self) -> bool {
        matches!(self, PermissionResult::Allow)
    }

    /// Whether this result settles the lookup
    pub fn is_decided(self) -> bool {
        !matches!(self, PermissionResult::Default)
    }
}

impl From<bool> for PermissionResult {
    fn from(allowed: bool) -> Self {
        if allowed {
            PermissionResult::Allow
        } else {
            PermissionResult::Deny
        }
    }
}

impl std::fmt::Display for PermissionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionResult::Allow => write!(f, "allow"),
            PermissionResult::Deny => write!(f, "deny"),
            PermissionResult::Default => write!(f, "default"),
        }
    }
}

/// A permission node together with its allow/deny flag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionState {
    permission: String,
    allowed: bool,
}

impl PermissionState {
    /// Create a new permission state
    pub fn new(permission: impl Into<String>, allowed: bool) -> Self {
        Self {
            permission: permission.into(),
            allowed,
        }
    }

    /// Shorthand for a granted node
    pub fn allow(permission: impl Into<String>) -> Self {
        Self::new(permission, true)
    }

    /// Shorthand for a revoked node
    pub fn deny(permission: impl Into<String>) -> Self {
        Self::new(permission, false)
    }

    /// The permission node this state applies to
    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// Whether the node is granted
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// The resolution outcome this state stands for
    pub fn result(&self) -> PermissionResult {
        PermissionResult::from(self.allowed)
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.allowed {
            write!(f, "{}", self.permission)
        } else {
            write!(f, "-{}", self.permission)
        }
    }
}
