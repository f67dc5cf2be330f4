//! Task status state machine and progress rollup.
//!
//! ```text
//!            +-----------------------------+
//!            v                             |
//!  pending <-> in_progress <-> on_hold     | reopen
//!     \            |             /         |
//!      +-----------+------------+---> completed   (gated on direct blockers)
//!                  |
//!                  +---> cancelled   (from any state, final)
//! ```
//!
//! Progress is 100 exactly while a task is completed. A parent's progress is
//! the mean of its direct subtasks and is recomputed, ancestor by ancestor,
//! whenever a subtask changes.

use crate::container::ContainerStore;
use crate::dependency::DependencyGraph;
use crate::error::{PlanError, Result};
use crate::settings::PlannerSettings;
use crate::types::{Mutation, MutationSet, Task, TaskContainer, TaskId, TaskStatus};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Highest progress an open task can hold
pub const MAX_OPEN_PROGRESS: u8 = 99;

/// What happened when a parent was offered completion by its subtasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOffer {
    pub parent: TaskId,
    pub completed: bool,
    /// Unmet blockers when the offer was declined
    pub blockers: Vec<TaskId>,
}

/// Result of a lifecycle operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub mutations: MutationSet,
    pub offers: Vec<CompletionOffer>,
}

impl TransitionOutcome {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.offers.is_empty()
    }

    pub fn merge(&mut self, other: TransitionOutcome) {
        self.mutations.extend(other.mutations);
        self.offers.extend(other.offers);
    }
}

/// Check a status change against the transition rules.
///
/// Same-state changes are accepted; callers treat them as no-ops.
pub fn check_transition(id: &TaskId, from: TaskStatus, to: TaskStatus) -> Result<()> {
    use TaskStatus::*;
    let allowed = match (from, to) {
        _ if from == to => true,
        (Cancelled, _) => false,
        (_, Cancelled) => true,
        (Completed, Pending) => true,
        (Completed, _) => false,
        // open -> open or open -> completed (gated separately)
        _ => true,
    };
    if allowed {
        Ok(())
    } else {
        Err(PlanError::InvalidTransition {
            id: id.to_string(),
            from,
            to,
        })
    }
}

/// Integer mean, rounded half up
fn mean_progress(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let n = values.len() as u32;
    let sum: u32 = values.iter().map(|v| *v as u32).sum();
    ((2 * sum + n) / (2 * n)) as u8
}

/// State machine over a board's tasks.
///
/// Borrows the task table mutably and reads the dependency graph and the
/// subtask ordering; it never changes either of those.
pub struct TaskLifecycle<'a> {
    tasks: &'a mut HashMap<TaskId, Task>,
    graph: &'a DependencyGraph,
    siblings: &'a ContainerStore<TaskContainer, TaskId>,
    settings: &'a PlannerSettings,
}

impl<'a> TaskLifecycle<'a> {
    pub fn new(
        tasks: &'a mut HashMap<TaskId, Task>,
        graph: &'a DependencyGraph,
        siblings: &'a ContainerStore<TaskContainer, TaskId>,
        settings: &'a PlannerSettings,
    ) -> Self {
        Self {
            tasks,
            graph,
            siblings,
            settings,
        }
    }

    /// Request the `completed` transition.
    ///
    /// Fails with `BlockedByDependencies` while any direct blocker is open.
    pub fn complete(&mut self, id: &TaskId) -> Result<TransitionOutcome> {
        let status = self.task(id)?.status;
        if status == TaskStatus::Completed {
            return Ok(TransitionOutcome::default());
        }
        check_transition(id, status, TaskStatus::Completed)?;

        let blockers = self.unmet_blockers(id);
        if !blockers.is_empty() {
            warn!(task = %id, blockers = blockers.len(), "completion blocked by dependencies");
            return Err(PlanError::BlockedByDependencies {
                task: id.clone(),
                blockers,
            });
        }

        let mut outcome = TransitionOutcome::default();
        let parent = self.write_status(id, TaskStatus::Completed, 100, &mut outcome)?;
        info!(task = %id, "task completed");
        self.rollup_into(parent, &mut outcome)?;
        Ok(outcome)
    }

    /// Reverse a completion: `completed -> pending`
    pub fn reopen(&mut self, id: &TaskId) -> Result<TransitionOutcome> {
        self.set_status(id, TaskStatus::Pending)
    }

    /// Cancel from any state
    pub fn cancel(&mut self, id: &TaskId) -> Result<TransitionOutcome> {
        self.set_status(id, TaskStatus::Cancelled)
    }

    /// Move a task to `to`, applying the transition rules
    pub fn set_status(&mut self, id: &TaskId, to: TaskStatus) -> Result<TransitionOutcome> {
        let task = self.task(id)?;
        let (from, progress) = (task.status, task.progress);
        if from == to {
            return Ok(TransitionOutcome::default());
        }
        check_transition(id, from, to)?;

        let progress = match to {
            TaskStatus::Completed => return self.complete(id),
            TaskStatus::Cancelled => progress.min(MAX_OPEN_PROGRESS),
            _ if from == TaskStatus::Completed => self.reopened_progress(id),
            _ => progress,
        };

        let mut outcome = TransitionOutcome::default();
        let parent = self.write_status(id, to, progress, &mut outcome)?;
        debug!(task = %id, %from, %to, "status changed");
        self.rollup_into(parent, &mut outcome)?;
        Ok(outcome)
    }

    /// Write progress on an open task.
    ///
    /// Values below 100 are clamped into 0..=99; 100 or more requests
    /// completion through the dependency gate.
    pub fn set_progress(&mut self, id: &TaskId, value: i32) -> Result<TransitionOutcome> {
        let task = self.task(id)?;
        let (status, current) = (task.status, task.progress);
        if !status.is_open() {
            return Err(PlanError::ProgressLocked {
                id: id.to_string(),
                status,
            });
        }
        if value >= 100 {
            return self.complete(id);
        }

        let progress = value.clamp(0, MAX_OPEN_PROGRESS as i32) as u8;
        if progress == current {
            return Ok(TransitionOutcome::default());
        }

        let mut outcome = TransitionOutcome::default();
        let parent = {
            let task = self.task_mut(id)?;
            task.progress = progress;
            task.touch();
            task.parent.clone()
        };
        outcome.mutations.push(Mutation::SetProgress {
            id: id.clone(),
            progress,
        });
        self.rollup_into(parent, &mut outcome)?;
        Ok(outcome)
    }

    /// Recompute `parent` and its ancestors from their direct subtasks
    pub fn rollup(&mut self, parent: &TaskId) -> Result<TransitionOutcome> {
        let mut outcome = TransitionOutcome::default();
        self.rollup_into(Some(parent.clone()), &mut outcome)?;
        Ok(outcome)
    }

    /// Open direct blockers of a task, sorted by id
    pub fn unmet_blockers(&self, id: &TaskId) -> Vec<TaskId> {
        let tasks = &*self.tasks;
        self.graph
            .unmet_blockers(id, |t| tasks.get(t).map(|task| task.status))
    }

    fn rollup_into(&mut self, start: Option<TaskId>, outcome: &mut TransitionOutcome) -> Result<()> {
        let mut current = start;
        while let Some(parent_id) = current {
            let children: Vec<(u8, bool)> = self
                .siblings
                .items(&TaskContainer::Parent(parent_id.clone()))
                .filter_map(|c| self.tasks.get(c))
                .map(|c| (c.progress, c.is_completed()))
                .collect();
            if children.is_empty() {
                break;
            }
            let progresses: Vec<u8> = children.iter().map(|(p, _)| *p).collect();
            let mean = mean_progress(&progresses);
            let all_completed = children.iter().all(|(_, done)| *done);

            let parent = self.task(&parent_id)?;
            let (status, progress) = (parent.status, parent.progress);
            let changed = match status {
                TaskStatus::Cancelled => false,
                TaskStatus::Completed if mean < 100 => {
                    info!(task = %parent_id, "subtask reopened; reopening parent");
                    self.write_status(&parent_id, TaskStatus::Pending, mean, outcome)?;
                    true
                }
                TaskStatus::Completed => false,
                _ if all_completed && self.settings.auto_complete_parents => {
                    self.offer_completion(&parent_id, progress, outcome)?
                }
                _ => {
                    let rolled = mean.min(MAX_OPEN_PROGRESS);
                    if rolled != progress {
                        self.write_progress(&parent_id, rolled, outcome)?;
                        true
                    } else {
                        false
                    }
                }
            };

            if !changed {
                break;
            }
            current = self.task(&parent_id)?.parent.clone();
        }
        Ok(())
    }

    /// Try the gated completion for a parent whose subtasks are all done.
    /// Returns whether the parent changed.
    fn offer_completion(
        &mut self,
        parent: &TaskId,
        progress: u8,
        outcome: &mut TransitionOutcome,
    ) -> Result<bool> {
        let blockers = self.unmet_blockers(parent);
        if blockers.is_empty() {
            info!(task = %parent, "all subtasks completed; completing parent");
            self.write_status(parent, TaskStatus::Completed, 100, outcome)?;
            outcome.offers.push(CompletionOffer {
                parent: parent.clone(),
                completed: true,
                blockers,
            });
            return Ok(true);
        }

        debug!(task = %parent, "all subtasks completed but parent is blocked");
        outcome.offers.push(CompletionOffer {
            parent: parent.clone(),
            completed: false,
            blockers,
        });
        if progress != MAX_OPEN_PROGRESS {
            self.write_progress(parent, MAX_OPEN_PROGRESS, outcome)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Progress a task takes when reopened: its rollup, or 0 for a leaf
    fn reopened_progress(&self, id: &TaskId) -> u8 {
        let progresses: Vec<u8> = self
            .siblings
            .items(&TaskContainer::Parent(id.clone()))
            .filter_map(|c| self.tasks.get(c))
            .map(|c| c.progress)
            .collect();
        mean_progress(&progresses).min(MAX_OPEN_PROGRESS)
    }

    /// Set status and progress, returning the task's parent
    fn write_status(
        &mut self,
        id: &TaskId,
        status: TaskStatus,
        progress: u8,
        outcome: &mut TransitionOutcome,
    ) -> Result<Option<TaskId>> {
        let task = self.task_mut(id)?;
        task.status = status;
        task.progress = progress;
        task.touch();
        let parent = task.parent.clone();
        outcome.mutations.push(Mutation::SetStatus {
            id: id.clone(),
            status,
            progress,
        });
        Ok(parent)
    }

    fn write_progress(&mut self, id: &TaskId, progress: u8, outcome: &mut TransitionOutcome) -> Result<()> {
        let task = self.task_mut(id)?;
        task.progress = progress;
        task.touch();
        outcome.mutations.push(Mutation::SetProgress {
            id: id.clone(),
            progress,
        });
        Ok(())
    }

    fn task(&self, id: &TaskId) -> Result<&Task> {
        self.tasks.get(id).ok_or_else(|| PlanError::task_not_found(id))
    }

    fn task_mut(&mut self, id: &TaskId) -> Result<&mut Task> {
        self.tasks
            .get_mut(id)
            .ok_or_else(|| PlanError::task_not_found(id))
    }
}
