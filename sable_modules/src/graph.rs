//! Dependency edges between loaded modules.
//!
//! An edge `from -> to` means `from` has used something owned by `to`. Both
//! directions are indexed, and every edge goes in and out through
//! [`DependencyGraph::link`] and [`DependencyGraph::unlink`], so the two
//! indexes can't disagree.

use crate::UnitId;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct DependencyGraph {
    requires: HashMap<UnitId, BTreeSet<UnitId>>,
    required_by: HashMap<UnitId, BTreeSet<UnitId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` depends on `to`. Returns whether the edge is new.
    /// Self-edges are never recorded.
    pub fn link(&mut self, from: UnitId, to: UnitId) -> bool {
        if from == to {
            return false;
        }

        let added = self.requires.entry(from).or_default().insert(to);
        if added {
            self.required_by.entry(to).or_default().insert(from);
        }
        added
    }

    /// Remove the edge `from -> to`, if present.
    pub fn unlink(&mut self, from: UnitId, to: UnitId) -> bool {
        let removed = remove_from(&mut self.requires, from, to);
        if removed {
            remove_from(&mut self.required_by, to, from);
        }
        removed
    }

    /// Remove every edge touching `unit`, in either direction.
    pub fn remove(&mut self, unit: UnitId) {
        for target in self.requires(unit).collect::<Vec<_>>() {
            self.unlink(unit, target);
        }
        for dependent in self.required_by(unit).collect::<Vec<_>>() {
            self.unlink(dependent, unit);
        }
    }

    /// Units that `unit` depends on
    pub fn requires(&self, unit: UnitId) -> impl Iterator<Item = UnitId> + '_ {
        self.requires.get(&unit).into_iter().flatten().copied()
    }

    /// Units that depend on `unit`
    pub fn required_by(&self, unit: UnitId) -> impl Iterator<Item = UnitId> + '_ {
        self.required_by.get(&unit).into_iter().flatten().copied()
    }

    pub fn depends_on(&self, from: UnitId, to: UnitId) -> bool {
        self.requires
            .get(&from)
            .map_or(false, |targets| targets.contains(&to))
    }

    pub fn edges(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.requires
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }

    pub fn edge_count(&self) -> usize {
        self.requires.values().map(BTreeSet::len).sum()
    }

    /// Check that the two indexes describe exactly the same edge set.
    pub fn is_consistent(&self) -> bool {
        let forward = self.edge_count();
        let backward: usize = self.required_by.values().map(BTreeSet::len).sum();

        forward == backward
            && self.edges().all(|(from, to)| {
                self.required_by
                    .get(&to)
                    .map_or(false, |deps| deps.contains(&from))
            })
    }

    /// `root` and everything that transitively depends on it, ordered so that
    /// every unit comes after all of its dependents. `root` is always last.
    ///
    /// Walks an explicit stack with a visited set, so dependency cycles
    /// terminate; within a cycle the order is arbitrary but each unit appears
    /// once.
    pub fn teardown_order(&self, root: UnitId) -> Vec<UnitId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(root, false)];

        while let Some((unit, expanded)) = stack.pop() {
            if expanded {
                order.push(unit);
                continue;
            }
            if !visited.insert(unit) {
                continue;
            }

            stack.push((unit, true));
            // Reversed so that dependents come off the stack in ID order
            let dependents: Vec<_> = self.required_by(unit).collect();
            for dependent in dependents.into_iter().rev() {
                if !visited.contains(&dependent) {
                    stack.push((dependent, false));
                }
            }
        }

        order
    }
}

fn remove_from(
    index: &mut HashMap<UnitId, BTreeSet<UnitId>>,
    key: UnitId,
    value: UnitId,
) -> bool {
    let Some(set) = index.get_mut(&key) else {
        return false;
    };
    let removed = set.remove(&value);
    if set.is_empty() {
        index.remove(&key);
    }
    removed
}
