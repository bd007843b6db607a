//! Planned and applied actions for collection reconciliation

use serde::{Deserialize, Serialize};

/// A single planned mutation against a remote collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (e.g. "create-10.0.3.0/24")
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g. "network-range", "nameserver")
    pub resource_type: String,

    /// Natural key of the item
    pub key: String,

    /// Remote id, present for items that already exist remotely
    pub remote_id: Option<String>,

    /// Description of the action
    pub description: String,
}

impl Action {
    pub fn create(resource_type: &str, key: &str) -> Self {
        Self {
            id: format!("create-{}", key),
            action_type: ActionType::Create,
            resource_type: resource_type.to_string(),
            key: key.to_string(),
            remote_id: None,
            description: format!("create {} {}", resource_type, key),
        }
    }

    pub fn delete(resource_type: &str, key: &str, remote_id: &str) -> Self {
        Self {
            id: format!("delete-{}", key),
            action_type: ActionType::Delete,
            resource_type: resource_type.to_string(),
            key: key.to_string(),
            remote_id: Some(remote_id.to_string()),
            description: format!("delete {} {} (ID: {})", resource_type, key, remote_id),
        }
    }

    pub fn no_op(resource_type: &str, key: &str, remote_id: Option<&str>) -> Self {
        Self {
            id: format!("noop-{}", key),
            action_type: ActionType::NoOp,
            resource_type: resource_type.to_string(),
            key: key.to_string(),
            remote_id: remote_id.map(str::to_string),
            description: format!("{} {} is up to date", resource_type, key),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new remote item
    Create,
    /// Delete an existing remote item
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Mutations that were committed remotely, in execution order
    pub succeeded: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult { action_id, message });
    }

    /// Ids of the committed actions
    pub fn completed_ids(&self) -> Vec<String> {
        self.succeeded.iter().map(|r| r.action_id.clone()).collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.succeeded.is_empty()
    }
}

/// Result of a single committed action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Success message
    pub message: String,
}

/// Plan containing all actions for one collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions, deletions first
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to delete, {} unchanged",
            self.create, self.delete, self.no_change
        )
    }
}
