//! Permission contexts and the graph they form
//!
//! A context holds permission data and names the contexts it inherits from.
//! Parents form a directed graph that may share ancestors or contain cycles;
//! the visitors in [`visitor`] deduplicate by identity, so neither is a
//! problem for resolution. Parent links are strong references, so a cycle
//! keeps its members alive until one of the links is removed.

pub mod visitor;

pub use visitor::ContextVisitor;

use crate::database::{LayeredDatabase, SourceList};
use crate::permission::resolver::{PermissionResolver, WildcardNodeResolver};
use crate::subject::PermissionSubject;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Identity of a context for deduplication during traversal
pub(crate) fn context_id(context: &dyn PermissionContext) -> usize {
    context as *const _ as *const () as usize
}

/// State every context carries: parents, databases and a default resolver
pub struct ContextData {
    parents: SourceList<dyn PermissionContext>,
    databases: LayeredDatabase,
    resolver: RwLock<Arc<dyn PermissionResolver>>,
}

impl ContextData {
    /// Empty data using the wildcard resolver
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(WildcardNodeResolver))
    }

    pub fn with_resolver(resolver: Arc<dyn PermissionResolver>) -> Self {
        Self {
            parents: SourceList::new(),
            databases: LayeredDatabase::new(),
            resolver: RwLock::new(resolver),
        }
    }
}

impl ContextData {
    pub(crate) fn resolver_slot(&self) -> &RwLock<Arc<dyn PermissionResolver>> {
        &self.resolver
    }
}

impl Default for ContextData {
    fn default() -> Self {
        Self::new()
    }
}

/// A node in the permission graph
pub trait PermissionContext: Send + Sync {
    /// Human-readable name, used in logs
    fn name(&self) -> &str;

    /// Backing state
    fn data(&self) -> &ContextData;

    /// Whether this context's data should be consulted for `subject`
    fn is_applicable(&self, subject: &PermissionSubject) -> bool;

    /// Snapshot of the parents in priority order
    fn parents(&self) -> Vec<Arc<dyn PermissionContext>> {
        self.data().parents.sources()
    }

    /// Append `parent` with the lowest priority. Returns false if it is
    /// already a parent.
    fn add_parent(&self, parent: Arc<dyn PermissionContext>) -> bool {
        let parents = &self.data().parents;
        if parents.contains(&parent) {
            return false;
        }
        debug!(context = self.name(), parent = parent.name(), "Adding parent context");
        parents.add_last(parent);
        true
    }

    /// Insert `parent` ahead of every other parent
    fn add_parent_first(&self, parent: Arc<dyn PermissionContext>) -> bool {
        let parents = &self.data().parents;
        if parents.contains(&parent) {
            return false;
        }
        debug!(context = self.name(), parent = parent.name(), "Adding parent context first");
        parents.add_first(parent);
        true
    }

    fn remove_parent(&self, parent: &Arc<dyn PermissionContext>) -> bool {
        let removed = self.data().parents.remove(parent);
        if removed {
            debug!(context = self.name(), parent = parent.name(), "Removed parent context");
        }
        removed
    }

    fn clear_parents(&self) {
        for parent in self.parents() {
            self.data().parents.remove(&parent);
        }
    }

    /// The layered database holding this context's own permissions
    fn databases(&self) -> &LayeredDatabase {
        &self.data().databases
    }

    fn default_resolver(&self) -> Arc<dyn PermissionResolver> {
        self.data().resolver.read().clone()
    }

    fn set_default_resolver(&self, resolver: Arc<dyn PermissionResolver>) {
        *self.data().resolver_slot().write() = resolver;
    }
}

/// A named context that applies to every subject, e.g. a group or a
/// per-world override
pub struct SimpleContext {
    name: String,
    data: ContextData,
}

impl SimpleContext {
    /// Create a context with no parents or databases
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ContextData::new(),
        }
    }
}

impl PermissionContext for SimpleContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> &ContextData {
        &self.data
    }

    fn is_applicable(&self, _subject: &PermissionSubject) -> bool {
        true
    }
}

impl std::fmt::Debug for SimpleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleContext")
            .field("name", &self.name)
            .field("parents", &self.data.parents.len())
            .field("databases", &self.data.databases.layers().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryDatabase, PermissionDatabase};
    use crate::permission::models::{PermissionResult, PermissionState};

    #[test]
    fn test_parents_keep_insertion_order() {
        let root = SimpleContext::new("root");
        let a: Arc<dyn PermissionContext> = Arc::new(SimpleContext::new("a"));
        let b: Arc<dyn PermissionContext> = Arc::new(SimpleContext::new("b"));

        assert!(root.add_parent(a.clone()));
        assert!(root.add_parent(b.clone()));
        let names: Vec<String> = root.parents().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_parent_is_rejected() {
        let root = SimpleContext::new("root");
        let a: Arc<dyn PermissionContext> = Arc::new(SimpleContext::new("a"));

        assert!(root.add_parent(a.clone()));
        assert!(!root.add_parent(a.clone()));
        assert!(!root.add_parent_first(a.clone()));
        assert_eq!(root.parents().len(), 1);
    }

    #[test]
    fn test_add_parent_first() {
        let root = SimpleContext::new("root");
        root.add_parent(Arc::new(SimpleContext::new("a")));
        root.add_parent_first(Arc::new(SimpleContext::new("b")));
        assert_eq!(root.parents()[0].name(), "b");
    }

    #[test]
    fn test_remove_and_clear_parents() {
        let root = SimpleContext::new("root");
        let a: Arc<dyn PermissionContext> = Arc::new(SimpleContext::new("a"));
        let b: Arc<dyn PermissionContext> = Arc::new(SimpleContext::new("b"));
        root.add_parent(a.clone());
        root.add_parent(b);

        assert!(root.remove_parent(&a));
        assert!(!root.remove_parent(&a));
        assert_eq!(root.parents().len(), 1);

        root.clear_parents();
        assert!(root.parents().is_empty());
    }

    #[test]
    fn test_databases_and_resolver() {
        let ctx = SimpleContext::new("group");
        ctx.databases()
            .add_last(Arc::new(MemoryDatabase::from_states([PermissionState::allow("a.*")])));

        let resolver = ctx.default_resolver();
        assert_eq!(
            resolver.resolve(ctx.databases(), "a.b"),
            PermissionResult::Allow
        );
        assert_eq!(ctx.databases().get_value("a.*"), Some(PermissionState::allow("a.*")));
    }

    #[test]
    fn test_context_identity() {
        let a = Arc::new(SimpleContext::new("same"));
        let b = Arc::new(SimpleContext::new("same"));
        let a_dyn: Arc<dyn PermissionContext> = a.clone();

        assert_eq!(context_id(&*a), context_id(&*a_dyn));
        assert_ne!(context_id(&*a), context_id(&*b));
    }
}
