//! Permission subjects: the entry point for permission checks
//!
//! A subject is a context of its own (it can hold permissions and parents)
//! that also answers `has_permission`. Answers are cached per node. The
//! cache does not track dependencies: after mutating any database reachable
//! from a subject, call [`PermissionSubject::invalidate`] or
//! [`PermissionSubject::invalidate_all`]. Swapping the default resolver
//! clears the cache automatically.
//!
//! Resolution only reads a context's databases when
//! [`PermissionContext::is_applicable`] accepts the subject being checked.
//! A context that declines counts as undecided but its parents are still
//! searched. This is how a subject's own permissions stay private to it and
//! how the default overlay is switched off.

use crate::cache::{CacheStats, ResultCache};
use crate::context::{ContextData, ContextVisitor, PermissionContext};
use crate::permission::models::PermissionResult;
use crate::permission::resolver::PermissionResolver;
use std::sync::Arc;
use tracing::{debug, trace};

/// An actor whose permissions can be checked, e.g. a player or the console
pub struct PermissionSubject {
    name: String,
    data: ContextData,
    cache: ResultCache,
}

impl PermissionSubject {
    /// Create a subject with no parents, databases or cached answers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ContextData::new(),
            cache: ResultCache::new(),
        }
    }

    /// Create a subject with a non-default resolver
    pub fn with_resolver(name: impl Into<String>, resolver: Arc<dyn PermissionResolver>) -> Self {
        Self {
            name: name.into(),
            data: ContextData::with_resolver(resolver),
            cache: ResultCache::new(),
        }
    }

    /// Whether the subject holds `node`. Undecided counts as not held.
    ///
    /// Nodes are lower-cased before lookup.
    pub fn has_permission(&self, node: &str) -> bool {
        self.permission(node).is_allowed()
    }

    /// Cached tri-state answer for `node`
    pub fn permission(&self, node: &str) -> PermissionResult {
        let node = node.to_lowercase();
        self.cache
            .get_or_compute(&node, || self.live_permission(&node))
    }

    /// Check `node` with a caller-supplied resolver, bypassing the cache
    pub fn has_permission_with(&self, node: &str, resolver: &dyn PermissionResolver) -> bool {
        self.resolve(&node.to_lowercase(), resolver).is_allowed()
    }

    /// Resolve `node` against the graph right now, ignoring the cache
    pub fn live_permission(&self, node: &str) -> PermissionResult {
        let resolver = self.default_resolver();
        self.resolve(node, resolver.as_ref())
    }

    /// Drop the cached answer for `node`
    pub fn invalidate(&self, node: &str) -> bool {
        self.cache.invalidate(&node.to_lowercase())
    }

    /// Drop every cached answer
    pub fn invalidate_all(&self) {
        debug!(subject = %self.name, "Invalidating permission cache");
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Breadth-first search for the nearest applicable context with an
    /// opinion on `node`
    fn resolve(&self, node: &str, resolver: &dyn PermissionResolver) -> PermissionResult {
        let mut found = ResolvingVisitor::new(self, node, resolver);
        ContextVisitor::BreadthFirst.visit(self, |context| found.apply(context));
        trace!(subject = %self.name, node, result = %found.result, "Resolved permission");
        found.result
    }
}

/// Traversal state: remembers the first decided result
struct ResolvingVisitor<'a> {
    subject: &'a PermissionSubject,
    node: &'a str,
    resolver: &'a dyn PermissionResolver,
    result: PermissionResult,
}

impl<'a> ResolvingVisitor<'a> {
    fn new(subject: &'a PermissionSubject, node: &'a str, resolver: &'a dyn PermissionResolver) -> Self {
        Self {
            subject,
            node,
            resolver,
            result: PermissionResult::Default,
        }
    }

    fn apply(&mut self, context: &dyn PermissionContext) -> bool {
        if !context.is_applicable(self.subject) {
            trace!(context = context.name(), "Skipping inapplicable context");
            return false;
        }
        self.result = self.resolver.resolve(context.databases(), self.node);
        self.result.is_decided()
    }
}

impl PermissionContext for PermissionSubject {
    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> &ContextData {
        &self.data
    }

    /// A subject's own permissions apply only to itself
    fn is_applicable(&self, subject: &PermissionSubject) -> bool {
        std::ptr::eq(self, subject)
    }

    fn set_default_resolver(&self, resolver: Arc<dyn PermissionResolver>) {
        let incoming = Arc::as_ptr(&resolver);
        let previous = std::mem::replace(&mut *self.data.resolver_slot().write(), resolver);
        if !std::ptr::addr_eq(Arc::as_ptr(&previous), incoming) {
            self.invalidate_all();
        }
    }
}

impl std::fmt::Debug for PermissionSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionSubject")
            .field("name", &self.name)
            .field("parents", &self.parents().len())
            .field("cached", &self.cache.len())
            .finish()
    }
}
