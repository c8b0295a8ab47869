//! Persisted default-permission configuration

use crate::error::{Error, Result};
use crate::permission::models::PermissionState;
use serde::{Deserialize, Serialize};

/// Operator-editable list of default permission nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// When false, nobody receives default permissions
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Nodes granted to every subject; a leading `-` revokes instead
    #[serde(default)]
    pub defaults: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl DefaultsConfig {
    /// Create an enabled configuration with no defaults
    pub fn new() -> Self {
        Self {
            enabled: true,
            defaults: Vec::new(),
        }
    }

    /// Append a raw entry (`node` or `-node`)
    pub fn add_entry(&mut self, entry: impl Into<String>) {
        self.defaults.push(entry.into());
    }

    /// Drop every entry that names `node`, whether granted or revoked.
    ///
    /// Returns true if anything was removed.
    pub fn remove_node(&mut self, node: &str) -> bool {
        let before = self.defaults.len();
        self.defaults
            .retain(|entry| parse_entry(entry).permission() != node);
        self.defaults.len() != before
    }

    /// Parse all entries into permission states
    pub fn states(&self) -> Vec<PermissionState> {
        self.defaults.iter().map(|entry| parse_entry(entry)).collect()
    }

    /// Reject entries that name no node at all
    pub fn validate(&self) -> Result<()> {
        for entry in &self.defaults {
            if parse_entry(entry).permission().trim().is_empty() {
                return Err(Error::ConfigError(format!(
                    "Invalid default permission entry: {:?}",
                    entry
                )));
            }
        }
        Ok(())
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a configured entry into a state; `-node` denies, anything else allows
pub fn parse_entry(entry: &str) -> PermissionState {
    match entry.strip_prefix('-') {
        Some(node) => PermissionState::deny(node.to_lowercase()),
        None => PermissionState::allow(entry.to_lowercase()),
    }
}
