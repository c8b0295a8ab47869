//! Permission values, resolution and persisted configuration

pub mod config;
pub mod models;
pub mod resolver;

pub use config::DefaultsConfig;
pub use models::{PermissionResult, PermissionState};
pub use resolver::{PermissionResolver, WildcardNodeResolver};
