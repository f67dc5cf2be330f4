//! PlanContext - the in-memory projection of one board
//!
//! The context holds the board's lists and tasks together with their two
//! orderings (lists within the board, tasks within their sibling container)
//! and the dependency graph. Every mutating method updates the projection and
//! returns the mutations the caller has to persist.

use crate::container::ContainerStore;
use crate::dependency::DependencyGraph;
use crate::error::{PlanError, Result};
use crate::lifecycle::{TaskLifecycle, TransitionOutcome};
use crate::ordering::PositionIndex;
use crate::settings::PlannerSettings;
use crate::types::{
    Board, BoardId, List, ListId, Mutation, MutationSet, NewTask, Task, TaskContainer, TaskId,
    TaskPatch, TaskStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// A blocking edge as stored externally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub blocking: TaskId,
    pub dependent: TaskId,
}

/// Serializable state of one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board: Board,
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

impl BoardSnapshot {
    /// Empty snapshot for a new board
    pub fn new(board: Board) -> Self {
        Self {
            board,
            lists: Vec::new(),
            tasks: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

/// Board state: lists, tasks, orderings and dependencies
#[derive(Debug, Clone)]
pub struct PlanContext {
    board: Board,
    lists: HashMap<ListId, List>,
    tasks: HashMap<TaskId, Task>,
    list_order: ContainerStore<BoardId, ListId>,
    task_order: ContainerStore<TaskContainer, TaskId>,
    graph: DependencyGraph,
    settings: PlannerSettings,
}

impl PlanContext {
    /// Create an empty context for a board
    pub fn new(board: Board, settings: PlannerSettings) -> Self {
        let index = PositionIndex::from_settings(&settings);
        let mut list_order = ContainerStore::new(index);
        list_order.add_container(board.id.clone());
        let mut task_order = ContainerStore::new(index);
        task_order.add_container(TaskContainer::Unlisted);

        Self {
            board,
            lists: HashMap::new(),
            tasks: HashMap::new(),
            list_order,
            task_order,
            graph: DependencyGraph::new(),
            settings,
        }
    }

    /// Build a context from stored state, validating references
    pub fn from_snapshot(snapshot: BoardSnapshot, settings: PlannerSettings) -> Result<Self> {
        let BoardSnapshot {
            board,
            lists,
            tasks,
            dependencies,
        } = snapshot;
        let mut ctx = Self::new(board, settings);

        for list in lists {
            if ctx.lists.contains_key(&list.id) {
                return Err(PlanError::duplicate_id("list", list.id.as_str()));
            }
            if list.board != ctx.board.id {
                return Err(PlanError::ForeignList {
                    id: list.id.to_string(),
                    board: list.board.to_string(),
                });
            }
            ctx.list_order
                .load_item(list.id.clone(), &ctx.board.id, list.position.clone())?;
            ctx.task_order.add_container(TaskContainer::List(list.id.clone()));
            ctx.lists.insert(list.id.clone(), list);
        }

        let mut load_order = Vec::with_capacity(tasks.len());
        for mut task in tasks {
            if ctx.tasks.contains_key(&task.id) {
                return Err(PlanError::duplicate_id("task", task.id.as_str()));
            }
            if task.parent.is_some() {
                task.list = None;
            }
            normalize_progress(&mut task);
            ctx.task_order
                .add_container(TaskContainer::Parent(task.id.clone()));
            load_order.push(task.id.clone());
            ctx.tasks.insert(task.id.clone(), task);
        }

        for id in &load_order {
            let Some(task) = ctx.tasks.get(id) else {
                continue;
            };
            let container = task.container();
            match &container {
                TaskContainer::List(list) if !ctx.lists.contains_key(list) => {
                    return Err(PlanError::list_not_found(list));
                }
                TaskContainer::Parent(parent) if !ctx.tasks.contains_key(parent) => {
                    return Err(PlanError::task_not_found(parent));
                }
                _ => {}
            }
            ctx.check_ancestry(id)?;
            let position = task.position.clone();
            ctx.task_order.load_item(id.clone(), &container, position)?;
        }

        for edge in dependencies {
            for end in [&edge.blocking, &edge.dependent] {
                if !ctx.tasks.contains_key(end) {
                    return Err(PlanError::task_not_found(end));
                }
            }
            ctx.graph.add_edge(&edge.blocking, &edge.dependent)?;
        }

        debug!(
            board = %ctx.board.id,
            lists = ctx.lists.len(),
            tasks = ctx.tasks.len(),
            edges = ctx.graph.edge_count(),
            "loaded board snapshot"
        );
        Ok(ctx)
    }

    /// Current state, lists in board order and tasks depth-first in display
    /// order
    pub fn snapshot(&self) -> BoardSnapshot {
        let lists: Vec<List> = self.lists_in_order().into_iter().cloned().collect();

        let mut tasks = Vec::with_capacity(self.tasks.len());
        for list in &lists {
            self.collect_subtree(&TaskContainer::List(list.id.clone()), &mut tasks);
        }
        self.collect_subtree(&TaskContainer::Unlisted, &mut tasks);

        let dependencies = self
            .graph
            .edges()
            .into_iter()
            .map(|(blocking, dependent)| DependencyEdge {
                blocking,
                dependent,
            })
            .collect();

        BoardSnapshot {
            board: self.board.clone(),
            lists,
            tasks,
            dependencies,
        }
    }

    fn collect_subtree(&self, container: &TaskContainer, out: &mut Vec<Task>) {
        for id in self.task_order.items(container) {
            if let Some(task) = self.tasks.get(id) {
                out.push(task.clone());
                self.collect_subtree(&TaskContainer::Parent(id.clone()), out);
            }
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn task_order(&self) -> &ContainerStore<TaskContainer, TaskId> {
        &self.task_order
    }

    pub fn list(&self, id: &ListId) -> Result<&List> {
        self.lists.get(id).ok_or_else(|| PlanError::list_not_found(id))
    }

    pub fn task(&self, id: &TaskId) -> Result<&Task> {
        self.tasks.get(id).ok_or_else(|| PlanError::task_not_found(id))
    }

    pub fn has_task(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Lists in board order
    pub fn lists_in_order(&self) -> Vec<&List> {
        self.list_order
            .items(&self.board.id)
            .filter_map(|id| self.lists.get(id))
            .collect()
    }

    /// Tasks of a sibling container in order
    pub fn tasks_in(&self, container: &TaskContainer) -> Vec<&Task> {
        self.task_order
            .items(container)
            .filter_map(|id| self.tasks.get(id))
            .collect()
    }

    /// Direct subtasks of a task in order
    pub fn subtasks(&self, id: &TaskId) -> Vec<&Task> {
        self.tasks_in(&TaskContainer::Parent(id.clone()))
    }

    /// Index of a task within its sibling container
    pub fn index_of(&self, id: &TaskId) -> Result<usize> {
        self.task_order
            .index_of(id)
            .ok_or_else(|| PlanError::task_not_found(id))
    }

    /// Open direct blockers of a task
    pub fn unmet_blockers(&self, id: &TaskId) -> Result<Vec<TaskId>> {
        self.task(id)?;
        Ok(self.graph.unmet_blockers(id, |t| self.status_of(t)))
    }

    pub fn is_blocked(&self, id: &TaskId) -> Result<bool> {
        self.task(id)?;
        Ok(self.graph.is_blocked(id, |t| self.status_of(t)))
    }

    /// Titles of the open direct blockers, for "Blocked by" messages
    pub fn blocked_titles(&self, id: &TaskId) -> Result<Vec<String>> {
        Ok(self
            .unmet_blockers(id)?
            .iter()
            .filter_map(|b| self.tasks.get(b))
            .map(|t| t.title.clone())
            .collect())
    }

    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.tasks.get(id).map(|t| t.status)
    }

    /// Lifecycle operations over this board's tasks
    pub fn lifecycle(&mut self) -> TaskLifecycle<'_> {
        TaskLifecycle::new(
            &mut self.tasks,
            &self.graph,
            &self.task_order,
            &self.settings,
        )
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Create a list at `index` among the board's lists
    pub fn create_list(&mut self, name: impl Into<String>, index: usize) -> Result<(ListId, MutationSet)> {
        self.create_list_with_id(ListId::new(), name, index)
    }

    /// Create a list with a caller-chosen id
    pub fn create_list_with_id(
        &mut self,
        id: ListId,
        name: impl Into<String>,
        index: usize,
    ) -> Result<(ListId, MutationSet)> {
        if self.lists.contains_key(&id) {
            return Err(PlanError::duplicate_id("list", id.as_str()));
        }
        let placement = self.list_order.insert_item(id.clone(), &self.board.id, index)?;
        let list = List::new(id.clone(), self.board.id.clone(), name, placement.position);
        self.task_order.add_container(TaskContainer::List(id.clone()));
        info!(list = %id, name = %list.name, "created list");
        self.lists.insert(id.clone(), list.clone());
        Ok((id, Mutation::CreateList { list }.into()))
    }

    pub fn rename_list(&mut self, id: &ListId, name: impl Into<String>) -> Result<MutationSet> {
        let name = name.into();
        let list = self
            .lists
            .get_mut(id)
            .ok_or_else(|| PlanError::list_not_found(id))?;
        if list.name == name {
            return Ok(MutationSet::new());
        }
        list.name = name.clone();
        Ok(Mutation::RenameList {
            id: id.clone(),
            name,
        }
        .into())
    }

    /// Move a list to `index` among the board's lists
    pub fn move_list(&mut self, id: &ListId, index: usize) -> Result<MutationSet> {
        self.list(id)?;
        if self.list_order.index_of(id) == Some(index) {
            return Ok(MutationSet::new());
        }
        let placement = self.list_order.move_item(id, &self.board.id, index)?;
        if let Some(list) = self.lists.get_mut(id) {
            list.position = placement.position.clone();
        }
        Ok(Mutation::PlaceList {
            id: id.clone(),
            position: placement.position,
        }
        .into())
    }

    /// Remove an empty list
    pub fn remove_list(&mut self, id: &ListId) -> Result<MutationSet> {
        self.list(id)?;
        let container = TaskContainer::List(id.clone());
        let count = self.task_order.len(&container);
        if count > 0 {
            return Err(PlanError::ListNotEmpty {
                id: id.to_string(),
                count,
            });
        }
        self.task_order.remove_container(&container)?;
        self.list_order.remove_item(id)?;
        self.lists.remove(id);
        info!(list = %id, "deleted list");
        Ok(Mutation::DeleteList { id: id.clone() }.into())
    }

    pub fn list_needs_rebalance(&self, id: &ListId) -> bool {
        self.task_order.needs_rebalance(&TaskContainer::List(id.clone()))
    }

    /// Respread the ranks of a sibling container's tasks
    pub fn rebalance(&mut self, container: &TaskContainer) -> Result<MutationSet> {
        let mut mutations = MutationSet::new();
        for placement in self.task_order.rebalance(container)? {
            if let Some(task) = self.tasks.get_mut(&placement.item) {
                task.position = placement.position.clone();
                mutations.push(Mutation::PlaceTask {
                    id: placement.item,
                    list: task.list.clone(),
                    parent: task.parent.clone(),
                    position: placement.position,
                });
            }
        }
        info!(%container, count = mutations.len(), "rebalanced tasks");
        Ok(mutations)
    }

    /// Respread the ranks of the board's lists
    pub fn rebalance_lists(&mut self) -> Result<MutationSet> {
        let mut mutations = MutationSet::new();
        for placement in self.list_order.rebalance(&self.board.id)? {
            if let Some(list) = self.lists.get_mut(&placement.item) {
                list.position = placement.position.clone();
            }
            mutations.push(Mutation::PlaceList {
                id: placement.item,
                position: placement.position,
            });
        }
        Ok(mutations)
    }

    pub fn lists_need_rebalance(&self) -> bool {
        self.list_order.needs_rebalance(&self.board.id)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Create a task at `index` of a sibling container
    pub fn create_task(
        &mut self,
        new: NewTask,
        container: &TaskContainer,
        index: usize,
    ) -> Result<(TaskId, TransitionOutcome)> {
        self.create_task_with_id(TaskId::new(), new, container, index)
    }

    /// Create a task with a caller-chosen id
    pub fn create_task_with_id(
        &mut self,
        id: TaskId,
        new: NewTask,
        container: &TaskContainer,
        index: usize,
    ) -> Result<(TaskId, TransitionOutcome)> {
        if self.tasks.contains_key(&id) {
            return Err(PlanError::duplicate_id("task", id.as_str()));
        }
        self.check_container(container)?;
        let placement = self.task_order.insert_item(id.clone(), container, index)?;
        let task = Task::from_new(id.clone(), new, container, placement.position);
        self.task_order.add_container(TaskContainer::Parent(id.clone()));
        debug!(task = %id, %container, "created task");
        self.tasks.insert(id.clone(), task.clone());

        let mut outcome = TransitionOutcome::default();
        outcome.mutations.push(Mutation::CreateTask {
            task: Box::new(task),
        });
        if let TaskContainer::Parent(parent) = container {
            outcome.merge(self.lifecycle().rollup(parent)?);
        }
        Ok((id, outcome))
    }

    /// Edit descriptive fields of a task
    pub fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<MutationSet> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| PlanError::task_not_found(id))?;
        if !patch.apply(task) {
            return Ok(MutationSet::new());
        }
        task.touch();
        Ok(Mutation::UpdateTask {
            id: id.clone(),
            patch,
        }
        .into())
    }

    /// Move a task to `index` of `target`.
    ///
    /// Subtasks travel with their parent. Both the old and the new parent
    /// are rolled up.
    pub fn move_task(
        &mut self,
        id: &TaskId,
        target: &TaskContainer,
        index: usize,
    ) -> Result<TransitionOutcome> {
        let from = self.task(id)?.container();
        self.check_container(target)?;
        if let TaskContainer::Parent(parent) = target {
            if parent == id || self.is_descendant(parent, id) {
                return Err(PlanError::InvalidParent {
                    id: id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        let placement = self.task_order.move_item(id, target, index)?;
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| PlanError::task_not_found(id))?;
        task.list = target.list().cloned();
        task.parent = target.parent().cloned();
        task.position = placement.position.clone();
        task.touch();

        let mut outcome = TransitionOutcome::default();
        outcome.mutations.push(Mutation::PlaceTask {
            id: id.clone(),
            list: task.list.clone(),
            parent: task.parent.clone(),
            position: placement.position,
        });

        if from != *target {
            if let TaskContainer::Parent(old) = &from {
                outcome.merge(self.lifecycle().rollup(old)?);
            }
        }
        if let TaskContainer::Parent(new) = target {
            outcome.merge(self.lifecycle().rollup(new)?);
        }
        Ok(outcome)
    }

    /// Delete a task, its subtasks recursively, and every dependency edge
    /// touching any of them
    pub fn delete_task(&mut self, id: &TaskId) -> Result<TransitionOutcome> {
        let parent = self.task(id)?.parent.clone();

        let mut doomed = Vec::new();
        self.collect_descendants(id, &mut doomed);
        doomed.push(id.clone());

        let mut outcome = TransitionOutcome::default();
        for task in &doomed {
            for (blocking, dependent) in self.graph.remove_task(task) {
                outcome.mutations.push(Mutation::RemoveDependency {
                    blocking,
                    dependent,
                });
            }
            self.task_order.remove_item(task)?;
            self.task_order
                .remove_container(&TaskContainer::Parent(task.clone()))?;
            self.tasks.remove(task);
            outcome.mutations.push(Mutation::DeleteTask { id: task.clone() });
        }
        info!(task = %id, removed = doomed.len(), "deleted task");

        if let Some(parent) = parent {
            outcome.merge(self.lifecycle().rollup(&parent)?);
        }
        Ok(outcome)
    }

    /// Descendants of a task, deepest first
    fn collect_descendants(&self, id: &TaskId, out: &mut Vec<TaskId>) {
        let children: Vec<TaskId> = self
            .task_order
            .items(&TaskContainer::Parent(id.clone()))
            .cloned()
            .collect();
        for child in children {
            self.collect_descendants(&child, out);
            out.push(child);
        }
    }

    /// Whether `candidate` lies below `ancestor` in the subtask tree
    fn is_descendant(&self, candidate: &TaskId, ancestor: &TaskId) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.tasks.get(candidate).and_then(|t| t.parent.as_ref());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if !seen.insert(parent) {
                return false;
            }
            current = self.tasks.get(parent).and_then(|t| t.parent.as_ref());
        }
        false
    }

    /// Reject parent chains that loop back to `id`
    fn check_ancestry(&self, id: &TaskId) -> Result<()> {
        if self.is_descendant(id, id) {
            let parent = self
                .tasks
                .get(id)
                .and_then(|t| t.parent.as_ref())
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(PlanError::InvalidParent {
                id: id.to_string(),
                parent,
            });
        }
        Ok(())
    }

    fn check_container(&self, container: &TaskContainer) -> Result<()> {
        match container {
            TaskContainer::List(list) => self.list(list).map(|_| ()),
            TaskContainer::Parent(parent) => self.task(parent).map(|_| ()),
            TaskContainer::Unlisted => Ok(()),
        }
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    /// Record that `dependent` is blocked by `blocking`
    pub fn add_dependency(&mut self, blocking: &TaskId, dependent: &TaskId) -> Result<MutationSet> {
        self.task(blocking)?;
        self.task(dependent)?;
        if !self.graph.add_edge(blocking, dependent)? {
            return Ok(MutationSet::new());
        }
        Ok(Mutation::AddDependency {
            blocking: blocking.clone(),
            dependent: dependent.clone(),
        }
        .into())
    }

    pub fn remove_dependency(&mut self, blocking: &TaskId, dependent: &TaskId) -> MutationSet {
        if !self.graph.remove_edge(blocking, dependent) {
            return MutationSet::new();
        }
        Mutation::RemoveDependency {
            blocking: blocking.clone(),
            dependent: dependent.clone(),
        }
        .into()
    }
}

/// Progress is 100 exactly while completed
fn normalize_progress(task: &mut Task) {
    let progress = match task.status {
        TaskStatus::Completed => 100,
        _ => task.progress.min(crate::lifecycle::MAX_OPEN_PROGRESS),
    };
    if progress != task.progress {
        debug!(task = %task.id, from = task.progress, to = progress, "normalized stored progress");
        task.progress = progress;
    }
}
