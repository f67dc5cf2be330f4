//! Ordered containers of items.
//!
//! `ContainerStore` is the in-memory projection of "which container holds
//! which items, in what order". It serves both tasks-in-lists and
//! lists-in-boards. Every mutating call returns the placement the caller has to
//! persist; nothing here performs I/O.

use crate::error::{PlanError, Result};
use crate::ordering::PositionIndex;
use crate::types::Ordinal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use tracing::debug;

/// Where an item ended up after a store operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement<C, I> {
    pub item: I,
    pub container: C,
    pub position: Ordinal,
}

/// Containers of rank-ordered items
#[derive(Debug, Clone)]
pub struct ContainerStore<C, I> {
    index: PositionIndex,
    /// Entries kept sorted by rank
    containers: HashMap<C, Vec<(I, Ordinal)>>,
    locations: HashMap<I, C>,
}

impl<C, I> Default for ContainerStore<C, I> {
    fn default() -> Self {
        Self {
            index: PositionIndex::default(),
            containers: HashMap::new(),
            locations: HashMap::new(),
        }
    }
}

impl<C, I> ContainerStore<C, I>
where
    C: Clone + Eq + Hash + Display,
    I: Clone + Eq + Hash + Display,
{
    pub fn new(index: PositionIndex) -> Self {
        Self {
            index,
            containers: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    pub fn position_index(&self) -> &PositionIndex {
        &self.index
    }

    /// Register a container. Returns false if it already existed.
    pub fn add_container(&mut self, container: C) -> bool {
        if self.containers.contains_key(&container) {
            return false;
        }
        self.containers.insert(container, Vec::new());
        true
    }

    pub fn has_container(&self, container: &C) -> bool {
        self.containers.contains_key(container)
    }

    /// Unregister an empty container
    pub fn remove_container(&mut self, container: &C) -> Result<()> {
        let entries = self.entries_of(container)?;
        if !entries.is_empty() {
            return Err(PlanError::ContainerNotEmpty {
                id: container.to_string(),
                count: entries.len(),
            });
        }
        self.containers.remove(container);
        Ok(())
    }

    pub fn containers(&self) -> impl Iterator<Item = &C> {
        self.containers.keys()
    }

    /// Insert a new item at `target_index` (clamped to the end)
    pub fn insert_item(
        &mut self,
        item: I,
        container: &C,
        target_index: usize,
    ) -> Result<Placement<C, I>> {
        if self.locations.contains_key(&item) {
            return Err(PlanError::duplicate_id("item", item.to_string()));
        }
        let entries = self.entries_of(container)?;
        let (index, position) = self.rank_at(entries, target_index)?;

        self.place(item.clone(), container.clone(), index, position.clone());
        debug!(%item, %container, index, %position, "inserted item");
        Ok(Placement {
            item,
            container: container.clone(),
            position,
        })
    }

    /// Restore an item with a rank read from the external store.
    ///
    /// Equal ranks are tolerated and keep load order; `needs_rebalance`
    /// reports them.
    pub fn load_item(&mut self, item: I, container: &C, position: Ordinal) -> Result<()> {
        if self.locations.contains_key(&item) {
            return Err(PlanError::duplicate_id("item", item.to_string()));
        }
        let entries = self.entries_of(container)?;
        let index = entries.partition_point(|(_, rank)| *rank <= position);
        self.place(item, container.clone(), index, position);
        Ok(())
    }

    /// Move an item to `target_index` of `target` (clamped to the end).
    ///
    /// The index is read after the item leaves its current container, so a
    /// move within one container lands the item exactly at `target_index`.
    /// On failure the store is left unchanged.
    pub fn move_item(
        &mut self,
        item: &I,
        target: &C,
        target_index: usize,
    ) -> Result<Placement<C, I>> {
        self.entries_of(target)?;
        let (from, from_index, old_rank) = self.detach(item)?;

        let entries = self.entries_of(target)?;
        match self.rank_at(entries, target_index) {
            Ok((index, position)) => {
                self.place(item.clone(), target.clone(), index, position.clone());
                debug!(%item, %from, to = %target, index, %position, "moved item");
                Ok(Placement {
                    item: item.clone(),
                    container: target.clone(),
                    position,
                })
            }
            Err(err) => {
                self.place(item.clone(), from, from_index, old_rank);
                Err(err)
            }
        }
    }

    /// Remove an item, returning its last placement
    pub fn remove_item(&mut self, item: &I) -> Result<Placement<C, I>> {
        let (container, _, position) = self.detach(item)?;
        debug!(%item, %container, "removed item");
        Ok(Placement {
            item: item.clone(),
            container,
            position,
        })
    }

    /// Items of a container in rank order (empty for unknown containers)
    pub fn items<'a>(&'a self, container: &C) -> impl Iterator<Item = &'a I> + 'a {
        self.containers
            .get(container)
            .into_iter()
            .flatten()
            .map(|(item, _)| item)
    }

    /// Items and ranks of a container in rank order
    pub fn entries<'a>(&'a self, container: &C) -> impl Iterator<Item = (&'a I, &'a Ordinal)> + 'a {
        self.containers
            .get(container)
            .into_iter()
            .flatten()
            .map(|(item, rank)| (item, rank))
    }

    pub fn len(&self, container: &C) -> usize {
        self.containers.get(container).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, container: &C) -> bool {
        self.len(container) == 0
    }

    pub fn contains(&self, item: &I) -> bool {
        self.locations.contains_key(item)
    }

    pub fn container_of(&self, item: &I) -> Option<&C> {
        self.locations.get(item)
    }

    /// Current index of an item within its container
    pub fn index_of(&self, item: &I) -> Option<usize> {
        let container = self.locations.get(item)?;
        self.containers
            .get(container)?
            .iter()
            .position(|(other, _)| other == item)
    }

    pub fn position_of(&self, item: &I) -> Option<&Ordinal> {
        let container = self.locations.get(item)?;
        self.containers
            .get(container)?
            .iter()
            .find(|(other, _)| other == item)
            .map(|(_, rank)| rank)
    }

    pub fn item_at(&self, container: &C, index: usize) -> Option<&I> {
        self.containers
            .get(container)?
            .get(index)
            .map(|(item, _)| item)
    }

    /// Whether a container's ranks should be respread
    pub fn needs_rebalance(&self, container: &C) -> bool {
        self.containers
            .get(container)
            .is_some_and(|entries| self.index.needs_rebalance(entries.iter().map(|(_, r)| r)))
    }

    /// Respread every rank of a container evenly, keeping the current order
    pub fn rebalance(&mut self, container: &C) -> Result<Vec<Placement<C, I>>> {
        let ranks: Vec<Ordinal> = self
            .entries_of(container)?
            .iter()
            .map(|(_, rank)| rank.clone())
            .collect();
        let respread = self.index.rebalance(&ranks);

        let entries = self
            .containers
            .get_mut(container)
            .ok_or_else(|| PlanError::ContainerNotFound {
                id: container.to_string(),
            })?;
        let mut placements = Vec::with_capacity(entries.len());
        for ((item, rank), position) in entries.iter_mut().zip(respread) {
            *rank = position.clone();
            placements.push(Placement {
                item: item.clone(),
                container: container.clone(),
                position,
            });
        }
        Ok(placements)
    }

    /// Check the ordering invariant: every container strictly increasing by
    /// rank, and every item located exactly once.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0;
        for (container, entries) in &self.containers {
            if entries.windows(2).any(|w| w[0].1 >= w[1].1) {
                return false;
            }
            for (item, _) in entries {
                if self.locations.get(item) != Some(container) {
                    return false;
                }
                seen += 1;
            }
        }
        seen == self.locations.len()
    }

    fn entries_of(&self, container: &C) -> Result<&Vec<(I, Ordinal)>> {
        self.containers
            .get(container)
            .ok_or_else(|| PlanError::ContainerNotFound {
                id: container.to_string(),
            })
    }

    fn rank_at(&self, entries: &[(I, Ordinal)], target_index: usize) -> Result<(usize, Ordinal)> {
        let index = target_index.min(entries.len());
        let before = index.checked_sub(1).and_then(|i| entries.get(i)).map(|(_, r)| r);
        let after = entries.get(index).map(|(_, r)| r);
        let position = self.index.position_between(before, after)?;
        Ok((index, position))
    }

    fn place(&mut self, item: I, container: C, index: usize, position: Ordinal) {
        if let Some(entries) = self.containers.get_mut(&container) {
            entries.insert(index, (item.clone(), position));
            self.locations.insert(item, container);
        }
    }

    fn detach(&mut self, item: &I) -> Result<(C, usize, Ordinal)> {
        let container = self
            .locations
            .get(item)
            .cloned()
            .ok_or_else(|| PlanError::ItemNotFound {
                id: item.to_string(),
            })?;
        let entries = self
            .containers
            .get_mut(&container)
            .ok_or_else(|| PlanError::ContainerNotFound {
                id: container.to_string(),
            })?;
        let index = entries
            .iter()
            .position(|(other, _)| other == item)
            .ok_or_else(|| PlanError::ItemNotFound {
                id: item.to_string(),
            })?;
        let (_, rank) = entries.remove(index);
        self.locations.remove(item);
        Ok((container, index, rank))
    }
}
