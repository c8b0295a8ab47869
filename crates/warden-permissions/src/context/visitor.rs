//! Traversal strategies over the context graph
//!
//! Both strategies visit each reachable context exactly once, keyed by
//! identity, and work from parent snapshots so a concurrent mutation of a
//! parent list cannot corrupt an in-flight traversal. Visit order is fully
//! determined by the graph and the order of each parent list.

use super::{context_id, PermissionContext};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// How to walk from a context towards its ancestors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextVisitor {
    /// Nearest contexts first; ties broken by parent-list order
    #[default]
    BreadthFirst,
    /// Pre-order: a parent's whole ancestry before the next parent
    DepthFirst,
}

impl ContextVisitor {
    /// Apply `predicate` to `start` and its ancestors until it returns true.
    ///
    /// Returns true if the predicate stopped the traversal.
    pub fn visit<F>(self, start: &dyn PermissionContext, mut predicate: F) -> bool
    where
        F: FnMut(&dyn PermissionContext) -> bool,
    {
        match self {
            ContextVisitor::BreadthFirst => breadth_first(start, &mut predicate),
            ContextVisitor::DepthFirst => depth_first(start, &mut predicate),
        }
    }
}

fn breadth_first(
    start: &dyn PermissionContext,
    predicate: &mut dyn FnMut(&dyn PermissionContext) -> bool,
) -> bool {
    let mut visited = HashSet::new();
    visited.insert(context_id(start));
    if predicate(start) {
        return true;
    }

    let mut queue: VecDeque<Arc<dyn PermissionContext>> = VecDeque::new();
    for parent in start.parents() {
        if visited.insert(context_id(parent.as_ref())) {
            queue.push_back(parent);
        }
    }

    while let Some(context) = queue.pop_front() {
        if predicate(context.as_ref()) {
            return true;
        }
        for parent in context.parents() {
            if visited.insert(context_id(parent.as_ref())) {
                queue.push_back(parent);
            }
        }
    }
    false
}

fn depth_first(
    start: &dyn PermissionContext,
    predicate: &mut dyn FnMut(&dyn PermissionContext) -> bool,
) -> bool {
    let mut visited = HashSet::new();
    visited.insert(context_id(start));
    if predicate(start) {
        return true;
    }

    let mut stack: Vec<Arc<dyn PermissionContext>> = start.parents();
    stack.reverse();

    while let Some(context) = stack.pop() {
        // a context can sit on the stack more than once when shared
        if !visited.insert(context_id(context.as_ref())) {
            continue;
        }
        if predicate(context.as_ref()) {
            return true;
        }
        let parents = context.parents();
        stack.extend(
            parents
                .into_iter()
                .rev()
                .filter(|parent| !visited.contains(&context_id(parent.as_ref()))),
        );
    }
    false
}
