//! Admitted subjects
//!
//! The registry is where join and leave events land: admitting a subject
//! attaches the default-permission context as its parent, leaving drops it
//! together with its cache.

use crate::context::PermissionContext;
use crate::defaults::DefaultPermissions;
use crate::subject::PermissionSubject;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

pub struct SubjectRegistry {
    defaults: Arc<DefaultPermissions>,
    subjects: DashMap<String, Arc<PermissionSubject>>,
}

impl SubjectRegistry {
    /// Create an empty registry that attaches `defaults` on admission
    pub fn new(defaults: Arc<DefaultPermissions>) -> Self {
        Self {
            defaults,
            subjects: DashMap::new(),
        }
    }

    /// The overlay attached to every admitted subject
    pub fn defaults(&self) -> &Arc<DefaultPermissions> {
        &self.defaults
    }

    /// Create and admit a subject called `name`, replacing any subject
    /// already admitted under that name
    pub fn admit(&self, name: &str) -> Arc<PermissionSubject> {
        let subject = Arc::new(PermissionSubject::new(name));
        self.admit_subject(subject.clone());
        subject
    }

    /// Admit an existing subject under its own name
    pub fn admit_subject(&self, subject: Arc<PermissionSubject>) {
        self.defaults.attach(&*subject);
        debug!(subject = subject.name(), "Admitted permission subject");
        self.subjects.insert(subject.name().to_string(), subject);
    }

    /// Drop the subject called `name`, e.g. on disconnect
    pub fn remove(&self, name: &str) -> Option<Arc<PermissionSubject>> {
        let removed = self.subjects.remove(name).map(|(_, subject)| subject);
        if removed.is_some() {
            debug!(subject = name, "Removed permission subject");
        }
        removed
    }

    /// Look up an admitted subject by name
    pub fn get(&self, name: &str) -> Option<Arc<PermissionSubject>> {
        self.subjects.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a subject called `name` is admitted
    pub fn contains(&self, name: &str) -> bool {
        self.subjects.contains_key(name)
    }

    /// Number of admitted subjects
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Whether no subject is admitted
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Every admitted subject, sorted by name
    pub fn subjects(&self) -> Vec<Arc<PermissionSubject>> {
        let mut subjects: Vec<Arc<PermissionSubject>> = self
            .subjects
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        subjects.sort_by(|a, b| a.name().cmp(b.name()));
        subjects
    }

    /// Admitted subjects that currently hold `node`
    pub fn subjects_with_node(&self, node: &str) -> Vec<Arc<PermissionSubject>> {
        self.subjects()
            .into_iter()
            .filter(|subject| subject.has_permission(node))
            .collect()
    }

    /// Clear every admitted subject's cache, e.g. after editing defaults
    pub fn invalidate_all(&self) {
        for subject in self.subjects() {
            subject.invalidate_all();
        }
    }
}
