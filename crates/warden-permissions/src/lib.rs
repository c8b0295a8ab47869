//! Permission resolution for Warden
//!
//! Subjects and the contexts they inherit from form a graph. Each context
//! holds a priority-ordered stack of permission databases; a check walks the
//! graph breadth-first from the subject and the first applicable context
//! whose resolver has an opinion on the node (exact or through a wildcard
//! ancestor such as `build.*`) decides. Results are cached per subject.

pub mod cache;
pub mod command;
pub mod context;
pub mod database;
pub mod defaults;
pub mod error;
pub mod permission;
pub mod registry;
pub mod storage;
pub mod subject;

pub use cache::{CacheStats, ResultCache};
pub use command::{CommandExecutionResult, CommandPermissions};
pub use context::{ContextData, ContextVisitor, PermissionContext, SimpleContext};
pub use database::{LayeredDatabase, MemoryDatabase, NodeMap, PermissionDatabase, SourceList};
pub use defaults::DefaultPermissions;
pub use error::{Error, Result};
pub use permission::{
    DefaultsConfig, PermissionResolver, PermissionResult, PermissionState, WildcardNodeResolver,
};
pub use registry::SubjectRegistry;
pub use storage::{DefaultsRepository, FileDefaultsRepository, InMemoryDefaultsRepository};
pub use subject::PermissionSubject;
