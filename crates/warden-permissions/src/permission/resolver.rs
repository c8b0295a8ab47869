//! Node resolution against a single database

use crate::database::PermissionDatabase;
use crate::permission::models::PermissionResult;
use tracing::trace;

/// Maps a node to a decision using one database
pub trait PermissionResolver: Send + Sync {
    fn resolve(&self, database: &dyn PermissionDatabase, node: &str) -> PermissionResult;
}

/// Resolver that falls back to wildcard ancestors of the node
///
/// For `this.is.a.node` the lookups are, in order: the node itself,
/// `this.is.a.*`, `this.is.*`, `this.*` and `*`. The first lookup with a
/// recorded state decides. Matching is byte-exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardNodeResolver;

impl WildcardNodeResolver {
    pub fn new() -> Self {
        Self
    }

    fn check(database: &dyn PermissionDatabase, node: &str) -> PermissionResult {
        database
            .get_value(node)
            .map(|state| state.result())
            .unwrap_or_default()
    }
}

impl PermissionResolver for WildcardNodeResolver {
    fn resolve(&self, database: &dyn PermissionDatabase, node: &str) -> PermissionResult {
        let exact = Self::check(database, node);
        if exact.is_decided() {
            trace!(node, result = %exact, "Resolved exact node");
            return exact;
        }

        // trailing empty segments name no prefix
        let segments = node.trim_end_matches('.');
        let mut candidate = String::with_capacity(node.len() + 1);
        for (dot, _) in segments.rmatch_indices('.') {
            candidate.clear();
            candidate.push_str(&segments[..=dot]);
            candidate.push('*');

            let result = Self::check(database, &candidate);
            if result.is_decided() {
                trace!(node, wildcard = %candidate, result = %result, "Resolved wildcard");
                return result;
            }
        }

        let result = Self::check(database, "*");
        trace!(node, result = %result, "Resolved against root wildcard");
        result
    }
}
