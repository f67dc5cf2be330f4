//! Mutation batches handed to the persistence layer.

use super::board::List;
use super::ids::{ListId, TaskId};
use super::position::Ordinal;
use super::task::{Task, TaskPatch, TaskStatus};
use serde::{Deserialize, Serialize};

/// A single field-level change for the caller to persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateTask {
        task: Box<Task>,
    },
    DeleteTask {
        id: TaskId,
    },
    PlaceTask {
        id: TaskId,
        list: Option<ListId>,
        parent: Option<TaskId>,
        position: Ordinal,
    },
    SetStatus {
        id: TaskId,
        status: TaskStatus,
        progress: u8,
    },
    SetProgress {
        id: TaskId,
        progress: u8,
    },
    UpdateTask {
        id: TaskId,
        patch: TaskPatch,
    },
    CreateList {
        list: List,
    },
    RenameList {
        id: ListId,
        name: String,
    },
    PlaceList {
        id: ListId,
        position: Ordinal,
    },
    DeleteList {
        id: ListId,
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

#[derive(Debug, Clone, PartialEq, Eq)]
enum Key<'a> {
    Task(&'a TaskId, u8),
    List(&'a ListId, u8),
    Edge(&'a TaskId, &'a TaskId),
}

impl Mutation {
    fn key(&self) -> Key<'_> {
        match self {
            Self::CreateTask { task } => Key::Task(&task.id, 0),
            Self::DeleteTask { id } => Key::Task(id, 1),
            Self::PlaceTask { id, .. } => Key::Task(id, 2),
            Self::SetStatus { id, .. } => Key::Task(id, 3),
            Self::SetProgress { id, .. } => Key::Task(id, 4),
            Self::UpdateTask { id, .. } => Key::Task(id, 5),
            Self::CreateList { list } => Key::List(&list.id, 0),
            Self::DeleteList { id } => Key::List(id, 1),
            Self::PlaceList { id, .. } => Key::List(id, 2),
            Self::RenameList { id, .. } => Key::List(id, 3),
            Self::AddDependency {
                blocking,
                dependent,
            }
            | Self::RemoveDependency {
                blocking,
                dependent,
            } => Key::Edge(blocking, dependent),
        }
    }

    /// Task whose row this mutation writes, if any
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::CreateTask { task } => Some(&task.id),
            Self::DeleteTask { id }
            | Self::PlaceTask { id, .. }
            | Self::SetStatus { id, .. }
            | Self::SetProgress { id, .. }
            | Self::UpdateTask { id, .. } => Some(id),
            _ => None,
        }
    }

    /// List whose row this mutation writes, if any
    pub fn list_id(&self) -> Option<&ListId> {
        match self {
            Self::CreateList { list } => Some(&list.id),
            Self::DeleteList { id } | Self::PlaceList { id, .. } | Self::RenameList { id, .. } => {
                Some(id)
            }
            _ => None,
        }
    }

    fn touches_edge_of(&self, task: &TaskId) -> bool {
        matches!(self, Self::AddDependency { blocking, dependent } if blocking == task || dependent == task)
    }
}

/// Ordered batch of changes.
///
/// Pushing a second write to the same row and field replaces the first, and
/// writes to a row created in the same batch are folded into the create, so a
/// batch carries at most one change per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationSet {
    mutations: Vec<Mutation>,
}

impl MutationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }

    /// Add a change, coalescing with earlier changes to the same field
    pub fn push(&mut self, mutation: Mutation) {
        if self.fold_into_create(&mutation) {
            return;
        }

        match &mutation {
            Mutation::DeleteTask { id } => {
                let created = self
                    .mutations
                    .iter()
                    .any(|m| matches!(m, Mutation::CreateTask { task } if &task.id == id));
                self.mutations
                    .retain(|m| m.task_id() != Some(id) && !m.touches_edge_of(id));
                if created {
                    return;
                }
            }
            Mutation::DeleteList { id } => {
                let created = self
                    .mutations
                    .iter()
                    .any(|m| matches!(m, Mutation::CreateList { list } if &list.id == id));
                self.mutations.retain(|m| m.list_id() != Some(id));
                if created {
                    return;
                }
            }
            Mutation::SetStatus { id, .. } => {
                self.mutations
                    .retain(|m| !matches!(m, Mutation::SetProgress { id: other, .. } if other == id));
            }
            Mutation::SetProgress { id, progress } => {
                let status = self.mutations.iter_mut().find_map(|m| match m {
                    Mutation::SetStatus {
                        id: other,
                        progress,
                        ..
                    } if other == id => Some(progress),
                    _ => None,
                });
                if let Some(slot) = status {
                    *slot = *progress;
                    return;
                }
            }
            Mutation::UpdateTask { id, patch } => {
                let existing = self.mutations.iter_mut().find_map(|m| match m {
                    Mutation::UpdateTask {
                        id: other,
                        patch: earlier,
                    } if other == id => Some(earlier),
                    _ => None,
                });
                if let Some(earlier) = existing {
                    merge_patch(earlier, patch);
                    return;
                }
            }
            Mutation::RemoveDependency {
                blocking,
                dependent,
            } => {
                let before = self.mutations.len();
                self.mutations.retain(|m| {
                    !matches!(m, Mutation::AddDependency { blocking: b, dependent: d }
                        if b == blocking && d == dependent)
                });
                if self.mutations.len() != before {
                    return;
                }
            }
            _ => {}
        }

        let key = mutation.key();
        match self.mutations.iter().position(|m| m.key() == key) {
            Some(index) => self.mutations[index] = mutation,
            None => self.mutations.push(mutation),
        }
    }

    /// Append every change of `other`
    pub fn extend(&mut self, other: MutationSet) {
        for mutation in other.mutations {
            self.push(mutation);
        }
    }

    fn fold_into_create(&mut self, mutation: &Mutation) -> bool {
        if let Some(id) = mutation.task_id() {
            let Some(task) = self.mutations.iter_mut().find_map(|m| match m {
                Mutation::CreateTask { task } if &task.id == id => Some(task),
                _ => None,
            }) else {
                return false;
            };
            match mutation {
                Mutation::PlaceTask {
                    list,
                    parent,
                    position,
                    ..
                } => {
                    task.list = list.clone();
                    task.parent = parent.clone();
                    task.position = position.clone();
                }
                Mutation::SetStatus {
                    status, progress, ..
                } => {
                    task.status = *status;
                    task.progress = *progress;
                }
                Mutation::SetProgress { progress, .. } => task.progress = *progress,
                Mutation::UpdateTask { patch, .. } => {
                    patch.apply(task);
                }
                _ => return false,
            }
            return true;
        }

        if let Some(id) = mutation.list_id() {
            let Some(list) = self.mutations.iter_mut().find_map(|m| match m {
                Mutation::CreateList { list } if &list.id == id => Some(list),
                _ => None,
            }) else {
                return false;
            };
            match mutation {
                Mutation::RenameList { name, .. } => list.name = name.clone(),
                Mutation::PlaceList { position, .. } => list.position = position.clone(),
                _ => return false,
            }
            return true;
        }

        false
    }
}

fn merge_patch(into: &mut TaskPatch, from: &TaskPatch) {
    if from.title.is_some() {
        into.title = from.title.clone();
    }
    if from.description.is_some() {
        into.description = from.description.clone();
    }
    if from.category.is_some() {
        into.category = from.category.clone();
    }
    if from.priority.is_some() {
        into.priority = from.priority;
    }
    if from.start_date.is_some() {
        into.start_date = from.start_date;
    }
    if from.due_date.is_some() {
        into.due_date = from.due_date;
    }
    if from.assignee.is_some() {
        into.assignee = from.assignee.clone();
    }
}

impl IntoIterator for MutationSet {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}

impl<'a> IntoIterator for &'a MutationSet {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}

impl From<Mutation> for MutationSet {
    fn from(mutation: Mutation) -> Self {
        let mut set = Self::new();
        set.push(mutation);
        set
    }
}
