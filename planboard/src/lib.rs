//! Task ordering and dependency engine for planning boards
//!
//! This crate is the in-memory core behind a Kanban board (lists of
//! draggable tasks) and a hierarchical task table (subtasks and blocking
//! dependencies). It never performs I/O: every mutating call updates the
//! projection and returns a [`MutationSet`] for the caller to persist.
//!
//! ## Overview
//!
//! - **Fractional ranks** - Siblings are ordered by base-62 rank strings, so a
//!   move writes one row instead of renumbering the list
//! - **Dependency gating** - A task can only complete once its direct
//!   blockers have; the graph rejects cycles at insertion
//! - **Progress rollup** - A parent's progress is the mean of its subtasks and
//!   completes (or reopens) with them
//! - **Gestures to batches** - Drags and list deletions become minimal
//!   mutation batches; an aborted drag changes nothing
//!
//! ## Basic Usage
//!
//! ```rust
//! use planboard::{Board, BoardController, DropTarget, NewTask, PlanContext, PlannerSettings};
//!
//! # fn example() -> planboard::Result<()> {
//! let context = PlanContext::new(Board::new("Q3 Launch"), PlannerSettings::default());
//! let mut board = BoardController::new(context);
//!
//! let (backlog, _) = board.create_list("Backlog", 0)?;
//! let (doing, _) = board.create_list("Doing", 1)?;
//! let (task, _) = board.create_task(NewTask::new("Book venue"), Some(&doing), None, 0)?;
//!
//! board.pick_up(&task)?;
//! board.drag_over(DropTarget::list(backlog, 0))?;
//! let mutations = board.drop()?;
//! assert!(mutations.is_some());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod command;
pub mod container;
mod context;
pub mod controller;
pub mod dependency;
mod error;
pub mod lifecycle;
pub mod ordering;
mod settings;
pub mod types;

pub use command::{apply_all, parse_commands, BoardCommand};
pub use container::{ContainerStore, Placement};
pub use context::{BoardSnapshot, DependencyEdge, PlanContext};
pub use controller::{BoardController, DeleteListStrategy, DropTarget};
pub use dependency::DependencyGraph;
pub use error::{PlanError, Result};
pub use lifecycle::{CompletionOffer, TaskLifecycle, TransitionOutcome};
pub use ordering::PositionIndex;
pub use settings::{PlannerSettings, DEFAULT_MAX_RANK_LEN};

// Re-export commonly used types
pub use types::{
    AssigneeId, Board, BoardId, List, ListId, Mutation, MutationSet, NewTask, Ordinal, Priority,
    Task, TaskContainer, TaskId, TaskPatch, TaskStatus, TaskSuggestion,
};
