//! Blocking relationships between tasks.
//!
//! An edge `blocking -> dependent` means the dependent cannot complete until
//! the blocking task has. The graph is kept acyclic at insertion time and is
//! keyed by task id in both directions, so cascades on task deletion are plain
//! map removals.

use crate::error::{PlanError, Result};
use crate::types::{TaskId, TaskStatus};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::{debug, warn};

/// Directed "blocked-by" graph over task ids
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// dependent -> its direct blockers
    blockers: HashMap<TaskId, BTreeSet<TaskId>>,
    /// blocking -> the tasks it blocks
    dependents: HashMap<TaskId, BTreeSet<TaskId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `blocking -> dependent`.
    ///
    /// Returns false if the edge already existed. Rejected edges leave the
    /// graph unchanged.
    pub fn add_edge(&mut self, blocking: &TaskId, dependent: &TaskId) -> Result<bool> {
        if blocking == dependent {
            return Err(PlanError::SelfDependency {
                id: blocking.to_string(),
            });
        }
        if self.contains_edge(blocking, dependent) {
            return Ok(false);
        }
        if let Some(path) = self.find_path(dependent, blocking) {
            let cycle = std::iter::once(blocking)
                .chain(path.iter())
                .map(TaskId::as_str)
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!(%blocking, %dependent, %cycle, "rejected dependency cycle");
            return Err(PlanError::CycleDetected { path: cycle });
        }

        self.blockers
            .entry(dependent.clone())
            .or_default()
            .insert(blocking.clone());
        self.dependents
            .entry(blocking.clone())
            .or_default()
            .insert(dependent.clone());
        debug!(%blocking, %dependent, "added dependency");
        Ok(true)
    }

    /// Remove `blocking -> dependent`. Returns false if it did not exist.
    pub fn remove_edge(&mut self, blocking: &TaskId, dependent: &TaskId) -> bool {
        let removed = remove_from(&mut self.blockers, dependent, blocking);
        remove_from(&mut self.dependents, blocking, dependent);
        if removed {
            debug!(%blocking, %dependent, "removed dependency");
        }
        removed
    }

    pub fn contains_edge(&self, blocking: &TaskId, dependent: &TaskId) -> bool {
        self.blockers
            .get(dependent)
            .is_some_and(|set| set.contains(blocking))
    }

    /// True iff any direct blocker is not completed.
    ///
    /// Only direct blockers count. A blocker unknown to `status_lookup` is
    /// treated as not completed.
    pub fn is_blocked<F>(&self, task: &TaskId, status_lookup: F) -> bool
    where
        F: Fn(&TaskId) -> Option<TaskStatus>,
    {
        self.blockers_of(task)
            .any(|b| status_lookup(b) != Some(TaskStatus::Completed))
    }

    /// Direct blockers that are not completed, sorted by id
    pub fn unmet_blockers<F>(&self, task: &TaskId, status_lookup: F) -> Vec<TaskId>
    where
        F: Fn(&TaskId) -> Option<TaskStatus>,
    {
        self.blockers_of(task)
            .filter(|b| status_lookup(b) != Some(TaskStatus::Completed))
            .cloned()
            .collect()
    }

    pub fn blockers_of<'a>(&'a self, task: &TaskId) -> impl Iterator<Item = &'a TaskId> + 'a {
        self.blockers.get(task).into_iter().flatten()
    }

    pub fn dependents_of<'a>(&'a self, task: &TaskId) -> impl Iterator<Item = &'a TaskId> + 'a {
        self.dependents.get(task).into_iter().flatten()
    }

    /// Remove every edge touching `task`, returning them as (blocking, dependent)
    pub fn remove_task(&mut self, task: &TaskId) -> Vec<(TaskId, TaskId)> {
        let mut removed = Vec::new();
        for blocking in self.blockers.remove(task).unwrap_or_default() {
            remove_from(&mut self.dependents, &blocking, task);
            removed.push((blocking, task.clone()));
        }
        for dependent in self.dependents.remove(task).unwrap_or_default() {
            remove_from(&mut self.blockers, &dependent, task);
            removed.push((task.clone(), dependent));
        }
        if !removed.is_empty() {
            debug!(%task, edges = removed.len(), "removed task from dependency graph");
        }
        removed
    }

    /// All edges as (blocking, dependent), sorted
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        let mut edges: Vec<(TaskId, TaskId)> = self
            .dependents
            .iter()
            .flat_map(|(blocking, set)| set.iter().map(move |d| (blocking.clone(), d.clone())))
            .collect();
        edges.sort();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }

    /// Whether any directed cycle exists
    pub fn has_cycle(&self) -> bool {
        let nodes: BTreeSet<&TaskId> = self
            .dependents
            .keys()
            .chain(self.blockers.keys())
            .collect();
        let ordered = self.topological_order(nodes.iter().copied());
        ordered.len() < nodes.len()
    }

    /// Order `tasks` so every blocker precedes its dependents; ties by id.
    ///
    /// Edges to tasks outside the given set are ignored. Tasks caught in a
    /// cycle are left out, which cannot happen for graphs built through
    /// `add_edge`.
    pub fn topological_order<'a, I>(&self, tasks: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = &'a TaskId>,
    {
        let members: BTreeSet<&TaskId> = tasks.into_iter().collect();
        let mut indegree: HashMap<&TaskId, usize> = members
            .iter()
            .map(|t| {
                let count = self.blockers_of(t).filter(|b| members.contains(b)).count();
                (*t, count)
            })
            .collect();

        let mut ready: BTreeSet<&TaskId> = indegree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(t, _)| *t)
            .collect();
        let mut ordered = Vec::with_capacity(members.len());

        while let Some(next) = ready.pop_first() {
            ordered.push(next.clone());
            for dependent in self.dependents_of(next) {
                if let Some(count) = indegree.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
        ordered
    }

    /// Path from `from` to `to` following blocking edges, both ends included
    fn find_path(&self, from: &TaskId, to: &TaskId) -> Option<Vec<TaskId>> {
        let mut came_from: HashMap<&TaskId, &TaskId> = HashMap::new();
        let mut queue: VecDeque<&TaskId> = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![current.clone()];
                let mut step = current;
                while let Some(prev) = came_from.get(step) {
                    if *prev == from {
                        break;
                    }
                    path.push((*prev).clone());
                    step = *prev;
                }
                path.push(from.clone());
                path.reverse();
                return Some(path);
            }
            for next in self.dependents_of(current) {
                if next != from && !came_from.contains_key(next) {
                    came_from.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

fn remove_from(map: &mut HashMap<TaskId, BTreeSet<TaskId>>, key: &TaskId, value: &TaskId) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}
