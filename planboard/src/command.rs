//! Named board operations.
//!
//! `BoardCommand` is the wire form of every mutating controller operation,
//! tagged by `op`:
//!
//! ```json
//! [
//!   { "op": "create_list", "id": "doing", "name": "Doing" },
//!   { "op": "create_task", "id": "t1", "title": "Book venue", "list": "doing" },
//!   { "op": "move_task", "task": "t1", "target": { "kind": "list", "list": "doing", "index": 0 } },
//!   { "op": "complete_task", "task": "t1" }
//! ]
//! ```
//!
//! Command files may hold a single command or an array, as JSON or YAML.

use crate::controller::{BoardController, DeleteListStrategy, DropTarget};
use crate::error::Result;
use crate::types::{
    ListId, MutationSet, NewTask, TaskContainer, TaskId, TaskPatch, TaskStatus, TaskSuggestion,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A mutating board operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BoardCommand {
    CreateList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<ListId>,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    RenameList {
        list: ListId,
        name: String,
    },
    MoveList {
        list: ListId,
        index: usize,
    },
    DeleteList {
        list: ListId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<DeleteListStrategy>,
    },
    RebalanceList {
        list: ListId,
    },
    CreateTask {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<TaskId>,
        #[serde(flatten)]
        task: NewTask,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        list: Option<ListId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<TaskId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    UpdateTask {
        task: TaskId,
        #[serde(flatten)]
        patch: TaskPatch,
    },
    MoveTask {
        task: TaskId,
        target: DropTarget,
    },
    NestTask {
        task: TaskId,
        parent: TaskId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    ImportSuggestions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        list: Option<ListId>,
        suggestions: Vec<TaskSuggestion>,
    },
    DeleteTask {
        task: TaskId,
    },
    CompleteTask {
        task: TaskId,
    },
    ReopenTask {
        task: TaskId,
    },
    CancelTask {
        task: TaskId,
    },
    SetStatus {
        task: TaskId,
        status: TaskStatus,
    },
    SetProgress {
        task: TaskId,
        progress: i32,
    },
    AddDependency {
        blocking: TaskId,
        dependent: TaskId,
    },
    RemoveDependency {
        blocking: TaskId,
        dependent: TaskId,
    },
}

impl BoardCommand {
    /// Stable operation name, as used in the `op` tag
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::CreateList { .. } => "create_list",
            Self::RenameList { .. } => "rename_list",
            Self::MoveList { .. } => "move_list",
            Self::DeleteList { .. } => "delete_list",
            Self::RebalanceList { .. } => "rebalance_list",
            Self::CreateTask { .. } => "create_task",
            Self::UpdateTask { .. } => "update_task",
            Self::MoveTask { .. } => "move_task",
            Self::NestTask { .. } => "nest_task",
            Self::ImportSuggestions { .. } => "import_suggestions",
            Self::DeleteTask { .. } => "delete_task",
            Self::CompleteTask { .. } => "complete_task",
            Self::ReopenTask { .. } => "reopen_task",
            Self::CancelTask { .. } => "cancel_task",
            Self::SetStatus { .. } => "set_status",
            Self::SetProgress { .. } => "set_progress",
            Self::AddDependency { .. } => "add_dependency",
            Self::RemoveDependency { .. } => "remove_dependency",
        }
    }

    /// Run the command against a controller
    pub fn apply(self, controller: &mut BoardController) -> Result<MutationSet> {
        debug!(op = self.op_name(), "applying command");
        match self {
            Self::CreateList { id, name, index } => {
                let index = index.unwrap_or(usize::MAX);
                let ctx = controller.context_mut();
                let (_, set) = match id {
                    Some(id) => ctx.create_list_with_id(id, name, index)?,
                    None => ctx.create_list(name, index)?,
                };
                Ok(set)
            }
            Self::RenameList { list, name } => controller.rename_list(&list, name),
            Self::MoveList { list, index } => controller.move_list(&list, index),
            Self::DeleteList { list, strategy } => controller.delete_list(&list, strategy),
            Self::RebalanceList { list } => controller.rebalance_list(&list),
            Self::CreateTask {
                id,
                task,
                list,
                parent,
                index,
            } => {
                let index = index.unwrap_or(usize::MAX);
                match id {
                    Some(id) => {
                        let container = match (parent, list) {
                            (Some(parent), _) => TaskContainer::Parent(parent),
                            (None, Some(list)) => TaskContainer::List(list),
                            (None, None) => TaskContainer::Unlisted,
                        };
                        let (_, outcome) = controller
                            .context_mut()
                            .create_task_with_id(id, task, &container, index)?;
                        Ok(outcome.mutations)
                    }
                    None => {
                        let (_, set) =
                            controller.create_task(task, list.as_ref(), parent.as_ref(), index)?;
                        Ok(set)
                    }
                }
            }
            Self::UpdateTask { task, patch } => controller.update_task(&task, patch),
            Self::MoveTask { task, target } => controller.on_drag_end(&task, target),
            Self::NestTask {
                task,
                parent,
                index,
            } => controller.nest_task(&task, &parent, index.unwrap_or(usize::MAX)),
            Self::ImportSuggestions { list, suggestions } => {
                let (_, set) = controller.import_suggestions(list.as_ref(), suggestions)?;
                Ok(set)
            }
            Self::DeleteTask { task } => controller.delete_task(&task),
            Self::CompleteTask { task } => Ok(controller.complete_task(&task)?.mutations),
            Self::ReopenTask { task } => Ok(controller.reopen_task(&task)?.mutations),
            Self::CancelTask { task } => Ok(controller.cancel_task(&task)?.mutations),
            Self::SetStatus { task, status } => Ok(controller.set_status(&task, status)?.mutations),
            Self::SetProgress { task, progress } => {
                Ok(controller.set_progress(&task, progress)?.mutations)
            }
            Self::AddDependency {
                blocking,
                dependent,
            } => controller.add_dependency(&blocking, &dependent),
            Self::RemoveDependency {
                blocking,
                dependent,
            } => Ok(controller.remove_dependency(&blocking, &dependent)),
        }
    }
}

/// Parse a command or an array of commands from JSON or YAML text
pub fn parse_commands(input: &str) -> Result<Vec<BoardCommand>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(input)?);
    }
    if trimmed.starts_with('{') {
        return Ok(vec![serde_json::from_str(input)?]);
    }
    let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(input)?;
    if value.is_sequence() {
        Ok(serde_yaml_ng::from_value(value)?)
    } else {
        Ok(vec![serde_yaml_ng::from_value(value)?])
    }
}

/// Apply commands in order, combining their mutations into one batch.
///
/// Stops at the first failing command; the controller keeps the changes of
/// the commands before it.
pub fn apply_all(
    controller: &mut BoardController,
    commands: impl IntoIterator<Item = BoardCommand>,
) -> Result<MutationSet> {
    let mut mutations = MutationSet::new();
    for command in commands {
        mutations.extend(command.apply(controller)?);
    }
    Ok(mutations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PlanContext;
    use crate::error::PlanError;
    use crate::settings::PlannerSettings;
    use crate::types::{Board, Mutation, Priority};

    fn controller() -> BoardController {
        BoardController::new(PlanContext::new(
            Board::new("Q3 Launch"),
            PlannerSettings::default(),
        ))
    }

    #[test]
    fn test_parse_json_array() {
        let commands = parse_commands(
            r#"[
                {"op": "create_list", "id": "doing", "name": "Doing"},
                {"op": "create_task", "id": "t1", "title": "Book venue", "list": "doing", "priority": "high"},
                {"op": "move_task", "task": "t1", "target": {"kind": "list", "list": "doing", "index": 0}}
            ]"#,
        )
        .unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1].op_name(), "create_task");
        match &commands[1] {
            BoardCommand::CreateTask { task, list, .. } => {
                assert_eq!(task.title, "Book venue");
                assert_eq!(task.priority, Priority::High);
                assert_eq!(list.as_ref().map(ListId::as_str), Some("doing"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_single_yaml() {
        let commands = parse_commands(
            "op: delete_list\nlist: backlog\nstrategy:\n  strategy: move_tasks_to\n  list: doing\n",
        )
        .unwrap();
        assert_eq!(
            commands,
            vec![BoardCommand::DeleteList {
                list: ListId::from_string("backlog"),
                strategy: Some(DeleteListStrategy::MoveTasksTo(ListId::from_string("doing"))),
            }]
        );
    }

    #[test]
    fn test_apply_all_combines_batches() {
        let mut controller = controller();
        let commands = parse_commands(
            r#"[
                {"op": "create_list", "id": "doing", "name": "Doing"},
                {"op": "create_task", "id": "a", "title": "A", "list": "doing"},
                {"op": "create_task", "id": "b", "title": "B", "list": "doing"},
                {"op": "add_dependency", "blocking": "a", "dependent": "b"},
                {"op": "complete_task", "task": "a"},
                {"op": "complete_task", "task": "b"}
            ]"#,
        )
        .unwrap();
        let set = apply_all(&mut controller, commands).unwrap();
        // list and two tasks, completions folded into the creates, plus the edge
        assert_eq!(set.len(), 4);
        assert!(set.iter().any(|m| matches!(
            m,
            Mutation::CreateTask { task } if task.id.as_str() == "b" && task.progress == 100
        )));
    }

    #[test]
    fn test_apply_stops_at_first_error() {
        let mut controller = controller();
        let commands = parse_commands(
            r#"[
                {"op": "create_task", "id": "a", "title": "A"},
                {"op": "create_task", "id": "b", "title": "B"},
                {"op": "add_dependency", "blocking": "a", "dependent": "b"},
                {"op": "set_progress", "task": "b", "progress": 100}
            ]"#,
        )
        .unwrap();
        let result = apply_all(&mut controller, commands);
        assert!(matches!(result, Err(PlanError::BlockedByDependencies { .. })));
        assert_eq!(controller.context().task_count(), 2);
    }
}
