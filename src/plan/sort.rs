// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Dependency-depth ordering
//!
//! Items are grouped by the length of the longest dependency chain below
//! them: depth 0 has no dependencies, depth n waits on something of depth
//! n - 1. The grouping is stable, so items of equal depth keep their input
//! order. Dependencies on keys outside the list are treated as already
//! satisfied.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::model::{Exec, ExecId};

/// Something that waits on other things of the same kind
pub trait Dependent {
    type Key: Copy + Eq + Hash;

    fn key(&self) -> Self::Key;

    fn dependencies(&self) -> Vec<Self::Key>;
}

impl<T: Dependent> Dependent for &T {
    type Key = T::Key;

    fn key(&self) -> T::Key {
        (**self).key()
    }

    fn dependencies(&self) -> Vec<T::Key> {
        (**self).dependencies()
    }
}

impl Dependent for Exec {
    type Key = ExecId;

    fn key(&self) -> ExecId {
        self.id
    }

    fn dependencies(&self) -> Vec<ExecId> {
        self.depends.clone()
    }
}

/// Orders items so each follows the items it depends on
pub struct TopologicalSorter;

impl TopologicalSorter {
    /// Single pass check that every listed dependency comes earlier
    pub fn is_sorted<T: Dependent>(items: &[T]) -> bool {
        let present: HashSet<T::Key> = items.iter().map(Dependent::key).collect();
        let mut seen = HashSet::with_capacity(items.len());

        for item in items {
            let waits_on_later = item
                .dependencies()
                .iter()
                .any(|dep| present.contains(dep) && !seen.contains(dep));
            if waits_on_later {
                return false;
            }
            seen.insert(item.key());
        }

        true
    }

    /// Longest-path depth of every item
    pub fn depths<T: Dependent>(items: &[T]) -> HashMap<T::Key, usize> {
        let index: HashMap<T::Key, usize> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key(), i))
            .collect();
        let mut depths = HashMap::with_capacity(items.len());
        let mut visiting = HashSet::new();

        for item in items {
            Self::depth_of(item.key(), items, &index, &mut depths, &mut visiting);
        }

        depths
    }

    fn depth_of<T: Dependent>(
        key: T::Key,
        items: &[T],
        index: &HashMap<T::Key, usize>,
        depths: &mut HashMap<T::Key, usize>,
        visiting: &mut HashSet<T::Key>,
    ) -> usize {
        if let Some(depth) = depths.get(&key) {
            return *depth;
        }
        let Some(&position) = index.get(&key) else {
            return 0;
        };
        if !visiting.insert(key) {
            tracing::warn!("dependency cycle while ordering; the back edge is ignored");
            return 0;
        }

        let depth = items[position]
            .dependencies()
            .into_iter()
            .filter(|dep| index.contains_key(dep))
            .map(|dep| 1 + Self::depth_of(dep, items, index, depths, visiting))
            .max()
            .unwrap_or(0);

        visiting.remove(&key);
        depths.insert(key, depth);
        depth
    }

    /// Stable grouping by depth
    pub fn sort<T: Dependent>(items: Vec<T>) -> Vec<T> {
        let depths = Self::depths(&items);
        let mut layered: Vec<(usize, T)> = items
            .into_iter()
            .map(|item| (depths.get(&item.key()).copied().unwrap_or(0), item))
            .collect();
        layered.sort_by_key(|(depth, _)| *depth);
        layered.into_iter().map(|(_, item)| item).collect()
    }
}
