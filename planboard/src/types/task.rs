//! Task types: Task, TaskStatus, Priority, and creation inputs

use super::ids::{AssigneeId, ListId, TaskId};
use super::position::Ordinal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Pending, in progress or on hold
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::OnHold)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Which sibling set a task is ordered within.
///
/// Positions are unique per (list, parent) pair. Subtasks are ordered under
/// their parent and carry no list of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskContainer {
    /// Top-level task in a board list
    List(ListId),
    /// Subtask of another task
    Parent(TaskId),
    /// Plan-level task outside any list
    Unlisted,
}

impl TaskContainer {
    pub fn list(&self) -> Option<&ListId> {
        match self {
            Self::List(id) => Some(id),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<&TaskId> {
        match self {
            Self::Parent(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for TaskContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(id) => write!(f, "list:{}", id),
            Self::Parent(id) => write!(f, "parent:{}", id),
            Self::Unlisted => f.write_str("unlisted"),
        }
    }
}

/// A task/card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TaskId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    /// 0-100; 100 only while completed
    #[serde(default)]
    pub progress: u8,
    pub position: Ordinal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AssigneeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task from creation input
    pub fn from_new(id: TaskId, new: NewTask, container: &TaskContainer, position: Ordinal) -> Self {
        let now = Utc::now();
        Self {
            id,
            list: container.list().cloned(),
            parent: container.parent().cloned(),
            title: new.title,
            description: new.description,
            category: new.category,
            status: TaskStatus::Pending,
            priority: new.priority,
            progress: 0,
            position,
            start_date: new.start_date,
            due_date: new.due_date,
            assignee: new.assignee,
            created_at: now,
            updated_at: now,
        }
    }

    /// The sibling set this task is ordered within
    pub fn container(&self) -> TaskContainer {
        match (&self.parent, &self.list) {
            (Some(parent), _) => TaskContainer::Parent(parent.clone()),
            (None, Some(list)) => TaskContainer::List(list.clone()),
            (None, None) => TaskContainer::Unlisted,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: Option<AssigneeId>,
}

impl NewTask {
    /// Create input with just a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Set the assignee
    pub fn with_assignee(mut self, assignee: impl Into<AssigneeId>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }
}

/// A task suggested by an external generator.
///
/// Suggestions carry no behaviour of their own; they are created through
/// the same path as manually entered tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSuggestion {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl From<TaskSuggestion> for NewTask {
    fn from(s: TaskSuggestion) -> Self {
        Self {
            title: s.title,
            description: s.description,
            category: s.category,
            priority: s.priority,
            start_date: s.start_date,
            due_date: s.due_date,
            assignee: None,
        }
    }
}

/// Field edits that do not touch ordering or lifecycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AssigneeId>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to a task, returning whether anything changed
    pub fn apply(&self, task: &mut Task) -> bool {
        let before = task.clone();
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(category) = &self.category {
            task.category = Some(category.clone());
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(start) = self.start_date {
            task.start_date = Some(start);
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = Some(assignee.clone());
        }
        *task != before
    }
}
