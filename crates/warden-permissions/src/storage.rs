//! Storage for the default-permission configuration
//!
//! The overlay only needs to load and save one small document; the file
//! format is YAML with an explanatory header for operators.

use crate::error::{Error, Result};
use crate::permission::DefaultsConfig;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const FILE_HEADER: &str = "\
# This is the configuration file for default server permissions.
# If enabled is set to false, by default nobody will have default permissions.
# Plugins can set their own default permissions, and server admins can
# set default permissions under the defaults section of this file.
";

/// Repository trait for storing and retrieving default permissions
pub trait DefaultsRepository: Send + Sync {
    /// Load the configuration from storage
    fn load_config(&self) -> Result<DefaultsConfig>;

    /// Save the configuration to storage
    fn save_config(&self, config: &DefaultsConfig) -> Result<()>;
}

/// YAML file-backed repository
pub struct FileDefaultsRepository {
    config_path: PathBuf,
}

impl FileDefaultsRepository {
    /// Repository backed by the file at `config_path`
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Repository at `<base>/permissions.yml`
    pub fn with_defaults<P: AsRef<Path>>(base_path: P) -> Self {
        Self::new(base_path.as_ref().join("permissions.yml"))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl DefaultsRepository for FileDefaultsRepository {
    fn load_config(&self) -> Result<DefaultsConfig> {
        if !self.config_path.exists() {
            // Return default config if file doesn't exist
            return Ok(DefaultsConfig::new());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        if content.trim().is_empty() {
            return Ok(DefaultsConfig::new());
        }
        let config: DefaultsConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn save_config(&self, config: &DefaultsConfig) -> Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let body = serde_yaml::to_string(config)?;
        std::fs::write(&self.config_path, format!("{}{}", FILE_HEADER, body))?;
        Ok(())
    }
}

/// In-memory repository (for testing and embedding)
#[derive(Clone, Default)]
pub struct InMemoryDefaultsRepository {
    config: Arc<RwLock<DefaultsConfig>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryDefaultsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-seeded with `config`
    pub fn with_config(config: DefaultsConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DefaultsRepository for InMemoryDefaultsRepository {
    fn load_config(&self) -> Result<DefaultsConfig> {
        let config = self
            .config
            .read()
            .map_err(|e| Error::Internal(format!("Failed to read config: {}", e)))?;
        Ok(config.clone())
    }

    fn save_config(&self, config: &DefaultsConfig) -> Result<()> {
        let mut stored_config = self
            .config
            .write()
            .map_err(|e| Error::Internal(format!("Failed to write config: {}", e)))?;
        *stored_config = config.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
