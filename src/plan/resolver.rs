// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Reachability between compiled jobs and checkpoint pruning

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::compile::JobSpec;
use crate::model::{ExecId, Library};

/// Memoized "waits for, directly or not" queries over compiled specs
pub struct DependencyResolver<'a> {
    specs: &'a BTreeMap<u32, JobSpec>,
    /// Every job reachable through wait-for edges, per source job
    reachable: HashMap<u32, HashSet<u32>>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(specs: &'a BTreeMap<u32, JobSpec>) -> Self {
        Self {
            specs,
            reachable: HashMap::new(),
        }
    }

    /// Whether job `a` has to wait for job `b`; a job depends on itself
    pub fn jobspec_depends_on(&mut self, a: u32, b: u32) -> bool {
        if a == b {
            return true;
        }
        let specs = self.specs;
        self.reachable
            .entry(a)
            .or_insert_with(|| Self::closure(specs, a))
            .contains(&b)
    }

    /// Jobs reachable from `source`; the visited set ends cycles
    fn closure(specs: &BTreeMap<u32, JobSpec>, source: u32) -> HashSet<u32> {
        let mut visited = HashSet::new();
        let mut stack = vec![source];
        while let Some(jnum) = stack.pop() {
            let Some(spec) = specs.get(&jnum) else {
                continue;
            };
            for wait in &spec.waitfor {
                if visited.insert(*wait) {
                    stack.push(*wait);
                }
            }
        }
        visited
    }

    /// Keep only the specs between the checkpoints
    ///
    /// With `begin`, a spec survives when it depends on one of the begin
    /// jobs. With `end`, it survives when one of the end jobs depends on it.
    /// Wait-for entries pointing at removed specs are dropped.
    pub fn prune(
        specs: BTreeMap<u32, JobSpec>,
        begin: Option<&[u32]>,
        end: Option<&[u32]>,
    ) -> BTreeMap<u32, JobSpec> {
        let keep: BTreeSet<u32> = {
            let mut resolver = DependencyResolver::new(&specs);
            specs
                .keys()
                .copied()
                .filter(|&jnum| {
                    let after_begin = begin.map_or(true, |jobs| {
                        jobs.iter().any(|&b| resolver.jobspec_depends_on(jnum, b))
                    });
                    let before_end = end.map_or(true, |jobs| {
                        jobs.iter().any(|&e| resolver.jobspec_depends_on(e, jnum))
                    });
                    after_begin && before_end
                })
                .collect()
        };

        tracing::debug!("pruning keeps {} of {} job specs", keep.len(), specs.len());

        specs
            .into_iter()
            .filter(|(jnum, _)| keep.contains(jnum))
            .map(|(jnum, mut spec)| {
                spec.waitfor.retain(|w| keep.contains(w));
                (jnum, spec)
            })
            .collect()
    }
}

/// Nearest block enclosing both `a` and `b`
pub fn common_ancestor(library: &Library, a: ExecId, b: ExecId) -> Option<ExecId> {
    let above_a: HashSet<ExecId> = library.ancestors(a).into_iter().collect();
    library
        .ancestors(b)
        .into_iter()
        .find(|block| above_a.contains(block))
}
