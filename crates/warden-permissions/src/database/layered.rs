//! Priority-ordered composite databases
//!
//! Sources are consulted in list order and the first one with an answer wins,
//! so position in the list is the priority. Insertion points are addressed by
//! source identity rather than by numeric priority. Every mutation is a
//! linear search over the sources.

use super::{NodeMap, PermissionDatabase, StateIter};
use crate::permission::models::PermissionState;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Ordered list of shared sources, compared by identity
pub struct SourceList<T: ?Sized> {
    sources: RwLock<Vec<Arc<T>>>,
}

impl<T: ?Sized> SourceList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
        }
    }

    /// Insert with the highest priority
    pub fn add_first(&self, source: Arc<T>) {
        self.sources.write().insert(0, source);
        debug!(position = 0, "Inserted entry first");
    }

    /// Insert with the lowest priority
    pub fn add_last(&self, source: Arc<T>) {
        let mut sources = self.sources.write();
        sources.push(source);
        debug!(position = sources.len() - 1, "Inserted entry last");
    }

    /// Insert directly ahead of `existing`, or first if it is not present
    pub fn add_before(&self, existing: &Arc<T>, source: Arc<T>) {
        let mut sources = self.sources.write();
        let index = position_of(&sources, existing).unwrap_or(0);
        sources.insert(index, source);
        debug!(position = index, "Inserted entry before reference");
    }

    /// Insert directly behind `existing`, or last if it is not present
    pub fn add_after(&self, existing: &Arc<T>, source: Arc<T>) {
        let mut sources = self.sources.write();
        let index = position_of(&sources, existing)
            .map(|i| i + 1)
            .unwrap_or(sources.len());
        sources.insert(index, source);
        debug!(position = index, "Inserted entry after reference");
    }

    /// Remove `source`; returns false if it was not present
    pub fn remove(&self, source: &Arc<T>) -> bool {
        let mut sources = self.sources.write();
        match position_of(&sources, source) {
            Some(index) => {
                sources.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `source` itself is in the list
    pub fn contains(&self, source: &Arc<T>) -> bool {
        position_of(&self.sources.read(), source).is_some()
    }

    /// Snapshot of the sources in priority order
    pub fn sources(&self) -> Vec<Arc<T>> {
        self.sources.read().clone()
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    /// Whether the list has no sources
    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

impl<T: ?Sized> Default for SourceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn position_of<T: ?Sized>(sources: &[Arc<T>], target: &Arc<T>) -> Option<usize> {
    sources
        .iter()
        .position(|candidate| std::ptr::addr_eq(Arc::as_ptr(candidate), Arc::as_ptr(target)))
}

/// A database made of other databases, first match wins
#[derive(Default)]
pub struct LayeredDatabase {
    layers: SourceList<dyn PermissionDatabase>,
}

impl LayeredDatabase {
    /// Create a database with no layers
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying source list, for reordering
    pub fn layers(&self) -> &SourceList<dyn PermissionDatabase> {
        &self.layers
    }

    /// Add a layer consulted before all others
    pub fn add_first(&self, source: Arc<dyn PermissionDatabase>) {
        self.layers.add_first(source);
    }

    /// Add a layer consulted after all others
    pub fn add_last(&self, source: Arc<dyn PermissionDatabase>) {
        self.layers.add_last(source);
    }

    /// Add a layer consulted just before `existing`
    pub fn add_before(
        &self,
        existing: &Arc<dyn PermissionDatabase>,
        source: Arc<dyn PermissionDatabase>,
    ) {
        self.layers.add_before(existing, source);
    }

    /// Add a layer consulted just after `existing`
    pub fn add_after(
        &self,
        existing: &Arc<dyn PermissionDatabase>,
        source: Arc<dyn PermissionDatabase>,
    ) {
        self.layers.add_after(existing, source);
    }

    /// Remove a layer by identity
    pub fn remove(&self, source: &Arc<dyn PermissionDatabase>) -> bool {
        self.layers.remove(source)
    }
}

impl PermissionDatabase for LayeredDatabase {
    /// Union of every layer. Useful for listing, not for resolution order.
    fn nodes(&self) -> NodeMap {
        let mut nodes = NodeMap::new();
        for layer in self.layers.sources() {
            for (node, states) in layer.nodes() {
                let merged = nodes.entry(node).or_default();
                for state in states {
                    if !merged.contains(&state) {
                        merged.push(state);
                    }
                }
            }
        }
        nodes
    }

    fn get_value(&self, node: &str) -> Option<PermissionState> {
        self.layers
            .sources()
            .iter()
            .find_map(|layer| layer.get_value(node))
    }

    fn states(&self) -> StateIter {
        Box::new(
            self.layers
                .sources()
                .into_iter()
                .flat_map(|layer| layer.states()),
        )
    }
}
