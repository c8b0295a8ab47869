//! Command authorization
//!
//! Commands declare the nodes that guard them. Callers only ever see a yes
//! or no; the graph, cache and resolver stay behind `has_permission`.

use crate::context::PermissionContext;
use crate::error::{Error, Result};
use crate::subject::PermissionSubject;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Outcome of running a command through its permission guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandExecutionResult {
    /// The command ran
    Executed,
    /// The subject lacked the required nodes
    Denied,
}

impl std::fmt::Display for CommandExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandExecutionResult::Executed => write!(f, "executed"),
            CommandExecutionResult::Denied => write!(f, "denied"),
        }
    }
}

/// Permission requirements of a single command
#[derive(Debug, Clone, Default)]
pub struct CommandPermissions {
    command: String,
    nodes: BTreeSet<String>,
    require_all: bool,
}

impl CommandPermissions {
    /// A command open to everyone until nodes are added
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            nodes: BTreeSet::new(),
            require_all: false,
        }
    }

    pub fn add_permission(&mut self, node: impl Into<String>) -> &mut Self {
        self.nodes.insert(node.into());
        self
    }

    pub fn remove_permission(&mut self, node: &str) -> &mut Self {
        self.nodes.remove(node);
        self
    }

    /// Require every node instead of any one of them
    pub fn set_require_all(&mut self, require_all: bool) -> &mut Self {
        self.require_all = require_all;
        self
    }

    pub fn requires_all(&self) -> bool {
        self.require_all
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.nodes
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether `subject` may run the command
    pub fn is_permitted(&self, subject: &PermissionSubject) -> bool {
        if self.nodes.is_empty() {
            return true;
        }
        if self.require_all {
            self.nodes.iter().all(|node| subject.has_permission(node))
        } else {
            self.nodes.iter().any(|node| subject.has_permission(node))
        }
    }

    /// Like [`is_permitted`](Self::is_permitted), as a `Result`
    pub fn check(&self, subject: &PermissionSubject) -> Result<()> {
        if self.is_permitted(subject) {
            return Ok(());
        }
        warn!(
            subject = subject.name(),
            command = %self.command,
            "Command refused: missing permission"
        );
        Err(Error::PermissionDenied {
            subject: subject.name().to_string(),
            command: self.command.clone(),
        })
    }

    /// Run `execute_fn` if `subject` is permitted
    pub fn execute_with_permission<F, T>(
        &self,
        subject: &PermissionSubject,
        execute_fn: F,
    ) -> Result<(CommandExecutionResult, Option<T>)>
    where
        F: FnOnce() -> Result<T>,
    {
        if !self.is_permitted(subject) {
            debug!(subject = subject.name(), command = %self.command, "Command denied");
            return Ok((CommandExecutionResult::Denied, None));
        }

        let output = execute_fn()?;
        Ok((CommandExecutionResult::Executed, Some(output)))
    }
}
