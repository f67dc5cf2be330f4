//! Core types for the planning engine

mod board;
mod ids;
mod mutation;
mod position;
mod task;

// Re-export all types
pub use board::{Board, List};
pub use ids::{AssigneeId, BoardId, ListId, TaskId};
pub use mutation::{Mutation, MutationSet};
pub use position::Ordinal;
pub use task::{NewTask, Priority, Task, TaskContainer, TaskPatch, TaskStatus, TaskSuggestion};
