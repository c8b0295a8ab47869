//! Default permissions shared by every admitted subject
//!
//! One overlay exists per running engine. It owns a context with two layers:
//! the operator-configured defaults loaded from storage, consulted first,
//! and the defaults registered by plugins at runtime. The context is
//! attached as a parent of each subject when it is admitted and only
//! applies while the `enabled` flag is set.
//!
//! Mutating defaults does not touch any subject's cache; callers invalidate
//! the subjects they care about (see `SubjectRegistry::invalidate_all`).

use crate::context::{ContextData, PermissionContext};
use crate::database::{MemoryDatabase, PermissionDatabase};
use crate::error::Result;
use crate::permission::config::parse_entry;
use crate::permission::{DefaultsConfig, PermissionState};
use crate::storage::DefaultsRepository;
use crate::subject::PermissionSubject;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const CONTEXT_NAME: &str = "Default Permissions";

struct DefaultPermissionContext {
    data: ContextData,
    enabled: Arc<AtomicBool>,
}

impl PermissionContext for DefaultPermissionContext {
    fn name(&self) -> &str {
        CONTEXT_NAME
    }

    fn data(&self) -> &ContextData {
        &self.data
    }

    fn is_applicable(&self, _subject: &PermissionSubject) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Engine-wide default-permission overlay
pub struct DefaultPermissions {
    repository: Arc<dyn DefaultsRepository>,
    config: RwLock<DefaultsConfig>,
    enabled: Arc<AtomicBool>,
    configured: Arc<MemoryDatabase>,
    plugin: Arc<MemoryDatabase>,
    context: Arc<DefaultPermissionContext>,
}

impl DefaultPermissions {
    /// Create the overlay and load the persisted configuration
    pub fn new(repository: Arc<dyn DefaultsRepository>) -> Self {
        let enabled = Arc::new(AtomicBool::new(true));
        let configured = Arc::new(MemoryDatabase::new());
        let plugin = Arc::new(MemoryDatabase::new());

        let context = Arc::new(DefaultPermissionContext {
            data: ContextData::new(),
            enabled: enabled.clone(),
        });
        context.databases().add_last(configured.clone());
        context.databases().add_last(plugin.clone());

        let defaults = Self {
            repository,
            config: RwLock::new(DefaultsConfig::new()),
            enabled,
            configured,
            plugin,
            context,
        };
        defaults.reload();
        defaults
    }

    /// Re-read the persisted configuration and rebuild the configured layer.
    ///
    /// A configuration that cannot be loaded is logged and the previous one
    /// stays in effect.
    pub fn reload(&self) {
        match self.repository.load_config() {
            Ok(config) => {
                *self.config.write() = config;
                // write back so a fresh install gets a commented file
                if let Err(e) = self.save() {
                    warn!(error = %e, "Failed to save default permissions after reload");
                }
            }
            Err(e) => {
                error!(error = %e, "Error loading permissions configuration");
            }
        }

        let config = self.config.read().clone();
        self.enabled.store(config.enabled, Ordering::Release);
        self.configured.replace_all(config.states());
        info!(
            enabled = config.enabled,
            defaults = self.configured.len(),
            "Reloaded default permissions"
        );
    }

    /// Persist the current configuration
    pub fn save(&self) -> Result<()> {
        let config = self.config.read().clone();
        self.repository.save_config(&config)
    }

    /// The shared context to attach to subjects
    pub fn context(&self) -> Arc<dyn PermissionContext> {
        self.context.clone()
    }

    /// Attach the default context as a parent of `subject`.
    ///
    /// Returns false if it was already attached.
    pub fn attach(&self, subject: &dyn PermissionContext) -> bool {
        subject.add_parent(self.context())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn the defaults on or off and persist the flag
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.config.write().enabled = enabled;
        self.enabled.store(enabled, Ordering::Release);
        debug!(enabled, "Default permissions toggled");
        self.save()
    }

    /// Snapshot of the persisted configuration
    pub fn config(&self) -> DefaultsConfig {
        self.config.read().clone()
    }

    /// Parse an entry in the configured format; `-node` denies
    pub fn to_permission_state(&self, entry: &str) -> PermissionState {
        parse_entry(entry)
    }

    /// Grant `node` to every subject as a plugin default
    pub fn add_default_permission(&self, node: &str) {
        self.add_default_permission_value(node, true);
    }

    /// Register `node` with the given flag as a plugin default
    pub fn add_default_permission_value(&self, node: &str, allowed: bool) {
        self.add_default_state(PermissionState::new(node, allowed));
    }

    pub fn add_default_state(&self, state: PermissionState) {
        debug!(state = %state, "Registering plugin default permission");
        self.plugin.insert(state);
    }

    /// Append an operator default (`node` or `-node`) and persist it
    pub fn add_configured_default(&self, entry: &str) -> Result<()> {
        let state = parse_entry(entry);
        self.config.write().add_entry(state.to_string());
        self.configured.insert(state);
        self.save()
    }

    /// Every default currently in effect; empty while disabled
    pub fn default_permissions(&self) -> HashSet<PermissionState> {
        if !self.is_enabled() {
            return HashSet::new();
        }
        self.configured
            .states()
            .chain(self.plugin.states())
            .collect()
    }

    /// Remove `node` from the defaults.
    ///
    /// Plugin-registered entries are removed first; only when there are none
    /// is the operator configuration edited and saved. Returns whether
    /// anything was removed.
    pub fn remove_default_permission(&self, node: &str) -> Result<bool> {
        let node = node.to_lowercase();
        if !self.plugin.remove_all(&node).is_empty() {
            debug!(node = %node, "Removed plugin default permission");
            return Ok(true);
        }

        if !self.configured.contains(&node) {
            return Ok(false);
        }
        self.configured.remove_all(&node);
        self.config.write().remove_node(&node);
        debug!(node = %node, "Removed configured default permission");
        self.save()?;
        Ok(true)
    }
}

impl std::fmt::Debug for DefaultPermissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultPermissions")
            .field("enabled", &self.is_enabled())
            .field("configured", &self.configured.len())
            .field("plugin", &self.plugin.len())
            .finish()
    }
}
