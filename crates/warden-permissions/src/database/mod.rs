//! Permission databases
//!
//! A database maps exact node strings to the states recorded for them. It
//! knows nothing about wildcards; that is the resolver's job.

pub mod layered;

pub use layered::{LayeredDatabase, SourceList};

use crate::permission::models::PermissionState;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Multimap from node to every state recorded under that exact node
pub type NodeMap = HashMap<String, Vec<PermissionState>>;

/// Iterator over a snapshot of a database's states
pub type StateIter = Box<dyn Iterator<Item = PermissionState> + Send>;

/// Source of permission states, looked up by exact node
pub trait PermissionDatabase: Send + Sync {
    /// Every node with all of its recorded states
    fn nodes(&self) -> NodeMap;

    /// The authoritative state for `node`, if any
    fn get_value(&self, node: &str) -> Option<PermissionState>;

    /// All contained states
    fn states(&self) -> StateIter;
}

/// Flat in-memory permission table
///
/// Nodes are lower-cased on the way in. Each node holds a set of states in
/// insertion order; `get_value` answers with the first one.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    entries: RwLock<NodeMap>,
}

impl MemoryDatabase {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from states
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = PermissionState>,
    {
        let db = Self::new();
        for state in states {
            db.insert(state);
        }
        db
    }

    /// Record a state. Returns false if an equal state was already present.
    pub fn insert(&self, state: PermissionState) -> bool {
        let state = if state.permission().chars().any(char::is_uppercase) {
            PermissionState::new(state.permission().to_lowercase(), state.is_allowed())
        } else {
            state
        };

        let mut entries = self.entries.write();
        let values = entries.entry(state.permission().to_string()).or_default();
        if values.contains(&state) {
            return false;
        }
        values.push(state);
        true
    }

    /// Record `node` with the given flag
    pub fn insert_node(&self, node: &str, allowed: bool) -> bool {
        self.insert(PermissionState::new(node, allowed))
    }

    /// Remove every state recorded for `node`, returning what was removed
    pub fn remove_all(&self, node: &str) -> Vec<PermissionState> {
        self.entries
            .write()
            .remove(&node.to_lowercase())
            .unwrap_or_default()
    }

    /// Whether any state is recorded for `node`
    pub fn contains(&self, node: &str) -> bool {
        self.entries.read().contains_key(&node.to_lowercase())
    }

    /// Swap the whole table for `states` under a single write lock, so
    /// readers see either the old contents or the new ones
    pub fn replace_all<I>(&self, states: I)
    where
        I: IntoIterator<Item = PermissionState>,
    {
        let mut table = NodeMap::new();
        for state in states {
            let state = PermissionState::new(state.permission().to_lowercase(), state.is_allowed());
            let values = table.entry(state.permission().to_string()).or_default();
            if !values.contains(&state) {
                values.push(state);
            }
        }
        *self.entries.write() = table;
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of distinct nodes
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl PermissionDatabase for MemoryDatabase {
    fn nodes(&self) -> NodeMap {
        self.entries.read().clone()
    }

    fn get_value(&self, node: &str) -> Option<PermissionState> {
        self.entries
            .read()
            .get(node)
            .and_then(|values| values.first().cloned())
    }

    fn states(&self) -> StateIter {
        let snapshot: Vec<PermissionState> =
            self.entries.read().values().flatten().cloned().collect();
        Box::new(snapshot.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_value() {
        let db = MemoryDatabase::new();
        assert!(db.insert_node("a.b", true));
        assert_eq!(db.get_value("a.b"), Some(PermissionState::allow("a.b")));
        assert_eq!(db.get_value("a.c"), None);
    }

    #[test]
    fn test_duplicate_state_is_ignored() {
        let db = MemoryDatabase::new();
        assert!(db.insert(PermissionState::allow("a")));
        assert!(!db.insert(PermissionState::allow("a")));
        assert_eq!(db.nodes()["a"].len(), 1);
    }

    #[test]
    fn test_first_inserted_state_is_authoritative() {
        let db = MemoryDatabase::new();
        db.insert(PermissionState::deny("a"));
        db.insert(PermissionState::allow("a"));

        assert_eq!(db.get_value("a"), Some(PermissionState::deny("a")));
        assert_eq!(db.nodes()["a"].len(), 2);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_nodes_are_lowercased_on_insert() {
        let db = MemoryDatabase::new();
        db.insert_node("Build.Place", true);

        assert!(db.contains("build.place"));
        assert!(db.contains("BUILD.PLACE"));
        assert_eq!(db.get_value("build.place"), Some(PermissionState::allow("build.place")));
        // exact lookups do not fold
        assert_eq!(db.get_value("Build.Place"), None);
    }

    #[test]
    fn test_remove_all() {
        let db = MemoryDatabase::new();
        db.insert(PermissionState::allow("a"));
        db.insert(PermissionState::deny("a"));
        db.insert(PermissionState::allow("b"));

        let removed = db.remove_all("a");
        assert_eq!(removed.len(), 2);
        assert!(!db.contains("a"));
        assert!(db.remove_all("a").is_empty());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_states_iterates_everything() {
        let db = MemoryDatabase::from_states(vec![
            PermissionState::allow("a"),
            PermissionState::deny("b"),
            PermissionState::allow("b"),
        ]);

        let mut states: Vec<String> = db.states().map(|s| s.to_string()).collect();
        states.sort();
        assert_eq!(states, vec!["-b", "a", "b"]);

        db.clear();
        assert!(db.is_empty());
        assert_eq!(db.states().count(), 0);
    }

    #[test]
    fn test_replace_all_swaps_contents() {
        let db = MemoryDatabase::from_states([PermissionState::allow("old")]);
        db.replace_all([
            PermissionState::allow("Build.*"),
            PermissionState::deny("build.break"),
            PermissionState::deny("build.break"),
        ]);

        assert!(!db.contains("old"));
        assert_eq!(db.len(), 2);
        assert_eq!(db.get_value("build.*"), Some(PermissionState::allow("build.*")));
        assert_eq!(db.nodes()["build.break"].len(), 1);

        db.replace_all(Vec::new());
        assert!(db.is_empty());
    }
}
