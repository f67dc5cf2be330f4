//! BoardController - turns board gestures into mutation batches
//!
//! The controller owns a [`PlanContext`] and a drag session. A drag is
//! `pick_up`, any number of `drag_over`, then `drop` or `abort`. Nothing is
//! changed until `drop` resolves the last hovered target; an aborted drag
//! leaves the board exactly as it was.

use crate::context::PlanContext;
use crate::error::{PlanError, Result};
use crate::lifecycle::TransitionOutcome;
use crate::types::{
    ListId, MutationSet, NewTask, TaskContainer, TaskId, TaskPatch, TaskStatus, TaskSuggestion,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Where a dragged task was released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// A slot in a list; `index` past the end appends
    List { list: ListId, index: usize },
    /// Another task; the dragged task takes its slot
    Task { task: TaskId },
}

impl DropTarget {
    pub fn list(list: impl Into<ListId>, index: usize) -> Self {
        Self::List {
            list: list.into(),
            index,
        }
    }

    pub fn task(task: impl Into<TaskId>) -> Self {
        Self::Task { task: task.into() }
    }
}

/// What happens to the tasks of a list being deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "list", rename_all = "snake_case")]
pub enum DeleteListStrategy {
    /// Delete the tasks with the list
    CascadeDeleteTasks,
    /// Append the tasks, in order, to another list
    MoveTasksTo(ListId),
}

#[derive(Debug, Clone)]
struct DragSession {
    task: TaskId,
    over: Option<DropTarget>,
}

/// Board gestures over a plan context
#[derive(Debug)]
pub struct BoardController {
    context: PlanContext,
    drag: Option<DragSession>,
}

impl BoardController {
    pub fn new(context: PlanContext) -> Self {
        Self {
            context,
            drag: None,
        }
    }

    pub fn context(&self) -> &PlanContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut PlanContext {
        &mut self.context
    }

    pub fn into_context(self) -> PlanContext {
        self.context
    }

    // =========================================================================
    // Drag session
    // =========================================================================

    /// Start dragging a task, replacing any unfinished drag
    pub fn pick_up(&mut self, task: &TaskId) -> Result<()> {
        self.context.task(task)?;
        debug!(%task, "picked up task");
        self.drag = Some(DragSession {
            task: task.clone(),
            over: None,
        });
        Ok(())
    }

    /// Record the target currently under the pointer
    pub fn drag_over(&mut self, target: DropTarget) -> Result<()> {
        let session = self.drag.as_mut().ok_or(PlanError::NoActiveDrag)?;
        session.over = Some(target);
        Ok(())
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Finish the drag.
    ///
    /// Returns `None` when no drag is active or nothing was hovered.
    pub fn drop(&mut self) -> Result<Option<MutationSet>> {
        let Some(session) = self.drag.take() else {
            return Ok(None);
        };
        match session.over {
            Some(target) => self.on_drag_end(&session.task, target).map(Some),
            None => {
                debug!(task = %session.task, "drag ended without a target");
                Ok(None)
            }
        }
    }

    /// Cancel the drag; returns the task that was being dragged
    pub fn abort(&mut self) -> Option<TaskId> {
        let session = self.drag.take()?;
        debug!(task = %session.task, "drag aborted");
        Some(session.task)
    }

    /// Apply a completed drag of `dragged` onto `target`
    pub fn on_drag_end(&mut self, dragged: &TaskId, target: DropTarget) -> Result<MutationSet> {
        self.context.task(dragged)?;
        let (container, index) = match target {
            DropTarget::List { list, index } => {
                self.context.list(&list)?;
                (TaskContainer::List(list), index)
            }
            DropTarget::Task { task } => {
                if &task == dragged {
                    return Ok(MutationSet::new());
                }
                let container = self.context.task(&task)?.container();
                (container, self.context.index_of(&task)?)
            }
        };

        let current = self.context.task(dragged)?.container();
        if current == container {
            let last = self.context.task_order().len(&container).saturating_sub(1);
            if self.context.index_of(dragged)? == index.min(last) {
                return Ok(MutationSet::new());
            }
        }
        Ok(self.context.move_task(dragged, &container, index)?.mutations)
    }

    // =========================================================================
    // Lists
    // =========================================================================

    pub fn create_list(&mut self, name: impl Into<String>, index: usize) -> Result<(ListId, MutationSet)> {
        self.context.create_list(name, index)
    }

    pub fn rename_list(&mut self, list: &ListId, name: impl Into<String>) -> Result<MutationSet> {
        self.context.rename_list(list, name)
    }

    pub fn move_list(&mut self, list: &ListId, index: usize) -> Result<MutationSet> {
        self.context.move_list(list, index)
    }

    /// Delete a list.
    ///
    /// A list with tasks needs a strategy; without one this fails with
    /// `ListNotEmpty` and nothing changes.
    pub fn delete_list(
        &mut self,
        list: &ListId,
        strategy: Option<DeleteListStrategy>,
    ) -> Result<MutationSet> {
        self.context.list(list)?;
        let container = TaskContainer::List(list.clone());
        let tasks: Vec<TaskId> = self
            .context
            .task_order()
            .items(&container)
            .cloned()
            .collect();

        let mut mutations = MutationSet::new();
        if !tasks.is_empty() {
            match strategy {
                None => {
                    warn!(%list, count = tasks.len(), "refusing to delete non-empty list");
                    return Err(PlanError::ListNotEmpty {
                        id: list.to_string(),
                        count: tasks.len(),
                    });
                }
                Some(DeleteListStrategy::MoveTasksTo(other)) if &other == list => {
                    return Err(PlanError::ListNotEmpty {
                        id: list.to_string(),
                        count: tasks.len(),
                    });
                }
                Some(DeleteListStrategy::CascadeDeleteTasks) => {
                    info!(%list, count = tasks.len(), "deleting list with its tasks");
                    for task in &tasks {
                        mutations.extend(self.context.delete_task(task)?.mutations);
                    }
                }
                Some(DeleteListStrategy::MoveTasksTo(other)) => {
                    self.context.list(&other)?;
                    info!(%list, to = %other, count = tasks.len(), "moving tasks before deleting list");
                    let target = TaskContainer::List(other);
                    for task in &tasks {
                        mutations.extend(self.context.move_task(task, &target, usize::MAX)?.mutations);
                    }
                }
            }
        }

        mutations.extend(self.context.remove_list(list)?);
        Ok(mutations)
    }

    /// Respread a list's task ranks
    pub fn rebalance_list(&mut self, list: &ListId) -> Result<MutationSet> {
        self.context.list(list)?;
        self.context.rebalance(&TaskContainer::List(list.clone()))
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Create a task at `index` of a list, under a parent, or unlisted.
    ///
    /// A parent wins over a list.
    pub fn create_task(
        &mut self,
        new: NewTask,
        list: Option<&ListId>,
        parent: Option<&TaskId>,
        index: usize,
    ) -> Result<(TaskId, MutationSet)> {
        let container = match (parent, list) {
            (Some(parent), _) => TaskContainer::Parent(parent.clone()),
            (None, Some(list)) => TaskContainer::List(list.clone()),
            (None, None) => TaskContainer::Unlisted,
        };
        let (id, outcome) = self.context.create_task(new, &container, index)?;
        Ok((id, outcome.mutations))
    }

    pub fn update_task(&mut self, task: &TaskId, patch: TaskPatch) -> Result<MutationSet> {
        self.context.update_task(task, patch)
    }

    /// Move a task under another task, at `index` among its subtasks
    pub fn nest_task(&mut self, task: &TaskId, parent: &TaskId, index: usize) -> Result<MutationSet> {
        let container = TaskContainer::Parent(parent.clone());
        Ok(self.context.move_task(task, &container, index)?.mutations)
    }

    /// Append generated suggestions to a list (or unlisted), in order
    pub fn import_suggestions(
        &mut self,
        list: Option<&ListId>,
        suggestions: Vec<TaskSuggestion>,
    ) -> Result<(Vec<TaskId>, MutationSet)> {
        if let Some(list) = list {
            self.context.list(list)?;
        }
        let mut ids = Vec::with_capacity(suggestions.len());
        let mut mutations = MutationSet::new();
        for suggestion in suggestions {
            let (id, set) = self.create_task(suggestion.into(), list, None, usize::MAX)?;
            ids.push(id);
            mutations.extend(set);
        }
        info!(count = ids.len(), "imported task suggestions");
        Ok((ids, mutations))
    }

    pub fn delete_task(&mut self, task: &TaskId) -> Result<MutationSet> {
        Ok(self.context.delete_task(task)?.mutations)
    }

    pub fn complete_task(&mut self, task: &TaskId) -> Result<TransitionOutcome> {
        self.context.lifecycle().complete(task)
    }

    pub fn reopen_task(&mut self, task: &TaskId) -> Result<TransitionOutcome> {
        self.context.lifecycle().reopen(task)
    }

    pub fn cancel_task(&mut self, task: &TaskId) -> Result<TransitionOutcome> {
        self.context.lifecycle().cancel(task)
    }

    pub fn set_status(&mut self, task: &TaskId, status: TaskStatus) -> Result<TransitionOutcome> {
        self.context.lifecycle().set_status(task, status)
    }

    pub fn set_progress(&mut self, task: &TaskId, progress: i32) -> Result<TransitionOutcome> {
        self.context.lifecycle().set_progress(task, progress)
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    pub fn add_dependency(&mut self, blocking: &TaskId, dependent: &TaskId) -> Result<MutationSet> {
        self.context.add_dependency(blocking, dependent)
    }

    pub fn remove_dependency(&mut self, blocking: &TaskId, dependent: &TaskId) -> MutationSet {
        self.context.remove_dependency(blocking, dependent)
    }

    /// Titles of the open tasks blocking `task`
    pub fn blocked_titles(&self, task: &TaskId) -> Result<Vec<String>> {
        self.context.blocked_titles(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PlannerSettings;
    use crate::types::{Board, Mutation};

    struct Setup {
        controller: BoardController,
        backlog: ListId,
        doing: ListId,
    }

    fn setup() -> Setup {
        let context = PlanContext::new(Board::new("Q3 Launch"), PlannerSettings::default());
        let mut controller = BoardController::new(context);
        let (backlog, _) = controller.create_list("Backlog", 0).unwrap();
        let (doing, _) = controller.create_list("Doing", 1).unwrap();
        Setup {
            controller,
            backlog,
            doing,
        }
    }

    fn add(controller: &mut BoardController, list: &ListId, title: &str) -> TaskId {
        controller
            .create_task(NewTask::new(title), Some(list), None, usize::MAX)
            .unwrap()
            .0
    }

    fn titles(controller: &BoardController, list: &ListId) -> Vec<String> {
        controller
            .context()
            .tasks_in(&TaskContainer::List(list.clone()))
            .into_iter()
            .map(|t| t.title.clone())
            .collect()
    }

    #[test]
    fn test_drop_on_list_slot() {
        let mut s = setup();
        let t1 = add(&mut s.controller, &s.doing, "T1");
        add(&mut s.controller, &s.doing, "T2");

        s.controller.pick_up(&t1).unwrap();
        s.controller.drag_over(DropTarget::list(s.backlog.clone(), 0)).unwrap();
        let set = s.controller.drop().unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert!(matches!(set.iter().next(), Some(Mutation::PlaceTask { .. })));
        assert_eq!(titles(&s.controller, &s.backlog), vec!["T1"]);
        assert_eq!(titles(&s.controller, &s.doing), vec!["T2"]);
        assert!(!s.controller.is_dragging());
    }

    #[test]
    fn test_drop_on_task_takes_its_slot() {
        let mut s = setup();
        let a = add(&mut s.controller, &s.doing, "A");
        add(&mut s.controller, &s.doing, "B");
        let c = add(&mut s.controller, &s.doing, "C");

        s.controller.on_drag_end(&a, DropTarget::task(c.clone())).unwrap();
        assert_eq!(titles(&s.controller, &s.doing), vec!["B", "C", "A"]);
        s.controller.on_drag_end(&a, DropTarget::task(c.clone())).unwrap();
        assert_eq!(titles(&s.controller, &s.doing), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_drop_on_self_is_empty() {
        let mut s = setup();
        let a = add(&mut s.controller, &s.doing, "A");
        let set = s.controller.on_drag_end(&a, DropTarget::task(a.clone())).unwrap();
        assert!(set.is_empty());
        let set = s.controller.on_drag_end(&a, DropTarget::list(s.doing.clone(), 0)).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_abort_and_targetless_drop() {
        let mut s = setup();
        let a = add(&mut s.controller, &s.doing, "A");

        s.controller.pick_up(&a).unwrap();
        s.controller.drag_over(DropTarget::list(s.backlog.clone(), 0)).unwrap();
        assert_eq!(s.controller.abort(), Some(a.clone()));
        assert_eq!(s.controller.drop().unwrap(), None);
        assert_eq!(titles(&s.controller, &s.doing), vec!["A"]);

        s.controller.pick_up(&a).unwrap();
        assert_eq!(s.controller.drop().unwrap(), None);
        assert!(matches!(
            s.controller.drag_over(DropTarget::list(s.backlog.clone(), 0)),
            Err(PlanError::NoActiveDrag)
        ));
    }

    #[test]
    fn test_delete_list_policies() {
        let mut s = setup();
        add(&mut s.controller, &s.backlog, "x");
        add(&mut s.controller, &s.backlog, "y");
        add(&mut s.controller, &s.doing, "z");

        assert!(matches!(
            s.controller.delete_list(&s.backlog, None),
            Err(PlanError::ListNotEmpty { count: 2, .. })
        ));

        let set = s
            .controller
            .delete_list(
                &s.backlog,
                Some(DeleteListStrategy::MoveTasksTo(s.doing.clone())),
            )
            .unwrap();
        assert!(set
            .iter()
            .any(|m| matches!(m, Mutation::DeleteList { id } if id == &s.backlog)));
        assert_eq!(titles(&s.controller, &s.doing), vec!["z", "x", "y"]);

        s.controller
            .delete_list(&s.doing, Some(DeleteListStrategy::CascadeDeleteTasks))
            .unwrap();
        assert_eq!(s.controller.context().task_count(), 0);
        assert!(s.controller.context().lists_in_order().is_empty());
    }

    #[test]
    fn test_import_suggestions_appends_in_order() {
        let mut s = setup();
        add(&mut s.controller, &s.backlog, "existing");
        let suggestions = vec![
            TaskSuggestion {
                title: "Draft press kit".into(),
                ..Default::default()
            },
            TaskSuggestion {
                title: "Book launch venue".into(),
                ..Default::default()
            },
        ];
        let (ids, set) = s
            .controller
            .import_suggestions(Some(&s.backlog), suggestions)
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(set.len(), 2);
        assert_eq!(
            titles(&s.controller, &s.backlog),
            vec!["existing", "Draft press kit", "Book launch venue"]
        );
    }
}
