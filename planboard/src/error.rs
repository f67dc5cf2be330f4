//! Error types for the planning engine

use crate::types::{TaskId, TaskStatus};
use thiserror::Error;

/// Result type for planning operations
pub type Result<T> = std::result::Result<T, PlanError>;

/// Errors that can occur in planning operations
#[derive(Debug, Error)]
pub enum PlanError {
    /// Caller passed neighbours that are not strictly ordered
    #[error("invalid ordering: '{before}' is not before '{after}'")]
    InvalidOrdering { before: String, after: String },

    /// A stored rank is not a valid base-62 fraction
    #[error("invalid rank '{rank}': {reason}")]
    InvalidRank { rank: String, reason: String },

    /// Adding the edge would close a cycle
    #[error("dependency cycle detected: {path}")]
    CycleDetected { path: String },

    /// A task cannot depend on itself
    #[error("task {id} cannot depend on itself")]
    SelfDependency { id: String },

    /// Completion refused because direct blockers are still open
    #[error("task {} is blocked by: {}", .task, join_ids(.blockers))]
    BlockedByDependencies { task: TaskId, blockers: Vec<TaskId> },

    /// List has tasks and no deletion strategy was supplied
    #[error("list '{id}' has {count} tasks and cannot be deleted")]
    ListNotEmpty { id: String, count: usize },

    /// Status change not permitted by the lifecycle
    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// Progress writes are only accepted on open tasks
    #[error("task {id} is {status}; its progress cannot change")]
    ProgressLocked { id: String, status: TaskStatus },

    /// Parent reference would make a task its own ancestor
    #[error("task {id} cannot be placed under {parent}")]
    InvalidParent { id: String, parent: String },

    /// Task not found
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// List not found
    #[error("list not found: {id}")]
    ListNotFound { id: String },

    /// Container not registered in a store
    #[error("container not found: {id}")]
    ContainerNotFound { id: String },

    /// Item not present in any container
    #[error("item not found: {id}")]
    ItemNotFound { id: String },

    /// Container still holds items
    #[error("container '{id}' still holds {count} items")]
    ContainerNotEmpty { id: String, count: usize },

    /// Stored list names a different board than the one being loaded
    #[error("list {id} belongs to board {board}")]
    ForeignList { id: String, board: String },

    /// Duplicate ID
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// Drop or drag-over without a picked-up task
    #[error("no drag in progress")]
    NoActiveDrag,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PlanError {
    /// Create an invalid rank error
    pub fn invalid_rank(rank: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRank {
            rank: rank.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.into(),
        }
    }

    /// Create a task not found error
    pub fn task_not_found(id: impl std::fmt::Display) -> Self {
        Self::TaskNotFound { id: id.to_string() }
    }

    /// Create a list not found error
    pub fn list_not_found(id: impl std::fmt::Display) -> Self {
        Self::ListNotFound { id: id.to_string() }
    }

    /// Whether the UI should render this as a message to the user rather
    /// than a generic failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. }
                | Self::SelfDependency { .. }
                | Self::BlockedByDependencies { .. }
                | Self::ListNotEmpty { .. }
                | Self::InvalidTransition { .. }
                | Self::ProgressLocked { .. }
                | Self::InvalidParent { .. }
        )
    }

    /// Whether the caller should re-fetch neighbour positions and retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidOrdering { .. })
    }
}
