//! Import report returned to the caller

use serde::Serialize;

use super::parser::ParseWarning;

/// Command counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandCounts {
    pub seen: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Grouping node counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeCounts {
    pub seen: usize,
    pub created: usize,
}

/// A command that was created or updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub command: String,
    /// Grouping node the command is filed under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub reason: String,
}

/// Why a command was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipOutcome {
    /// Already present and not overridden
    Duplicate,
    /// Resolving or writing the command failed
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCommand {
    pub command: String,
    pub outcome: SkipOutcome,
    pub reason: String,
}

/// A grouping node created by the import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A grouping node that could not be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
    pub name: String,
    pub reason: String,
}

/// Result of an import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub vendor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub dry_run: bool,
    pub override_existing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub lossy_decode: bool,

    pub commands: CommandCounts,
    pub nodes: NodeCounts,

    pub created_commands: Vec<CommandOutcome>,
    pub updated_commands: Vec<CommandOutcome>,
    pub skipped_commands: Vec<SkippedCommand>,
    pub created_nodes: Vec<NodeOutcome>,
    pub failed_nodes: Vec<NodeFailure>,
    pub warnings: Vec<ParseWarning>,

    /// History id; `None` for dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
}

impl ImportReport {
    pub fn new(vendor: impl Into<String>, override_existing: bool, dry_run: bool) -> Self {
        Self {
            vendor: vendor.into(),
            root: None,
            dry_run,
            override_existing,
            encoding: None,
            lossy_decode: false,
            commands: CommandCounts::default(),
            nodes: NodeCounts::default(),
            created_commands: Vec::new(),
            updated_commands: Vec::new(),
            skipped_commands: Vec::new(),
            created_nodes: Vec::new(),
            failed_nodes: Vec::new(),
            warnings: Vec::new(),
            run_id: None,
        }
    }

    pub fn command_created(&mut self, command: &str, node: Option<&str>) {
        self.commands.created += 1;
        self.created_commands.push(CommandOutcome {
            command: command.to_string(),
            node: node.map(str::to_string),
            reason: "created".to_string(),
        });
    }

    pub fn command_updated(&mut self, command: &str, node: Option<&str>) {
        self.commands.updated += 1;
        self.updated_commands.push(CommandOutcome {
            command: command.to_string(),
            node: node.map(str::to_string),
            reason: "existing command overwritten".to_string(),
        });
    }

    pub fn command_duplicate(&mut self, command: &str) {
        self.commands.skipped += 1;
        self.skipped_commands.push(SkippedCommand {
            command: command.to_string(),
            outcome: SkipOutcome::Duplicate,
            reason: "duplicate command for vendor, not overridden".to_string(),
        });
    }

    pub fn command_failed(&mut self, command: &str, reason: impl ToString) {
        self.commands.skipped += 1;
        self.skipped_commands.push(SkippedCommand {
            command: command.to_string(),
            outcome: SkipOutcome::Failed,
            reason: reason.to_string(),
        });
    }

    pub fn node_created(&mut self, name: &str, parent: Option<&str>) {
        self.nodes.created += 1;
        self.created_nodes.push(NodeOutcome {
            name: name.to_string(),
            parent: parent.map(str::to_string),
        });
    }

    pub fn node_failed(&mut self, name: &str, reason: impl ToString) {
        self.failed_nodes.push(NodeFailure {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Number of skipped commands that failed rather than being duplicates
    pub fn failed_count(&self) -> usize {
        self.skipped_commands
            .iter()
            .filter(|s| s.outcome == SkipOutcome::Failed)
            .count()
    }

    /// True if nothing was created or updated
    pub fn is_noop(&self) -> bool {
        self.commands.created == 0 && self.commands.updated == 0 && self.nodes.created == 0
    }
}
