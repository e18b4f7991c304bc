// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! State of one compilation
//!
//! Every memo table lives here and dies with the compilation, so two
//! compilations never see each other's job numbers or file history.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::final_jobs::FinalJobsAnalyzer;
use super::jobspec::JobSpec;
use crate::config::CompilerConfig;
use crate::dataset::{DataSet, NodeId};
use crate::errors::Diagnostics;
use crate::model::{ExecId, Library};

/// Job numbers keyed by (instance, dataset node)
#[derive(Debug)]
pub struct JobNumbers {
    bound: u32,
    next: u32,
    wrapped: bool,
    assigned: HashMap<(ExecId, NodeId), u32>,
}

impl JobNumbers {
    pub fn new(bound: u32) -> Self {
        Self {
            bound: bound.max(1),
            next: 1,
            wrapped: false,
            assigned: HashMap::new(),
        }
    }

    /// Number already given to a pair
    pub fn get(&self, exec: ExecId, node: NodeId) -> Option<u32> {
        self.assigned.get(&(exec, node)).copied()
    }

    /// Number of a pair, assigning the next one on first use
    ///
    /// Numbers run from 1 to the bound and then start over at 1.
    pub fn calc(&mut self, exec: ExecId, node: NodeId, diags: &mut Diagnostics) -> u32 {
        if let Some(jnum) = self.get(exec, node) {
            return jnum;
        }

        let jnum = self.next;
        if self.next >= self.bound {
            self.next = 1;
            if !self.wrapped {
                self.wrapped = true;
                diags.add_warning(&format!(
                    "job numbers wrapped after {}; later jobs may reuse numbers",
                    self.bound
                ));
            }
        } else {
            self.next += 1;
        }

        self.assigned.insert((exec, node), jnum);
        jnum
    }
}

/// One production of a logical file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileSnapShot {
    pub producer: ExecId,
    pub node: NodeId,
    pub in_name: String,
    pub in_format: String,
    pub out_name: String,
    pub out_format: String,
}

pub(crate) struct CompileContext<'c> {
    pub config: &'c CompilerConfig,
    pub library: Library,
    pub dataset: DataSet,
    pub diags: Diagnostics,
    pub specs: BTreeMap<u32, JobSpec>,
    pub numbers: JobNumbers,
    /// Snapshots per file id, oldest first
    pub history: HashMap<String, Vec<FileSnapShot>>,
    /// Conversion jobs per (consumer, node, file id)
    pub conversions: HashMap<(ExecId, NodeId, String), ExecId>,
    compiled: HashSet<(ExecId, NodeId)>,
    final_jobs: FinalJobsAnalyzer,
    iterated: HashMap<ExecId, Vec<NodeId>>,
    descendants: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl<'c> CompileContext<'c> {
    pub fn new(config: &'c CompilerConfig, library: Library, dataset: DataSet) -> Self {
        Self {
            config,
            library,
            dataset,
            diags: Diagnostics::new(),
            specs: BTreeMap::new(),
            numbers: JobNumbers::new(config.job_number_bound),
            history: HashMap::new(),
            conversions: HashMap::new(),
            compiled: HashSet::new(),
            final_jobs: FinalJobsAnalyzer::new(),
            iterated: HashMap::new(),
            descendants: HashMap::new(),
        }
    }

    pub fn calc_job_num(&mut self, exec: ExecId, node: NodeId) -> u32 {
        self.numbers.calc(exec, node, &mut self.diags)
    }

    /// Marks a pair as compiled; false when it already was
    pub fn start_job(&mut self, exec: ExecId, node: NodeId) -> bool {
        self.compiled.insert((exec, node))
    }

    pub fn final_jobs(&mut self, exec: ExecId) -> BTreeSet<ExecId> {
        self.final_jobs.final_jobs(&self.library, exec)
    }

    /// Dataset nodes an instance runs on
    pub fn iterated_nodes(&mut self, exec: ExecId) -> Vec<NodeId> {
        if let Some(nodes) = self.iterated.get(&exec) {
            return nodes.clone();
        }
        let path = self.library.full_path(exec);
        let nodes = self.dataset.get_children(DataSet::ROOT, &path);
        self.iterated.insert(exec, nodes.clone());
        nodes
    }

    pub fn descendants(&mut self, node: NodeId) -> &BTreeSet<NodeId> {
        let dataset = &self.dataset;
        self.descendants
            .entry(node)
            .or_insert_with(|| dataset.descendants(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobType;

    fn ids() -> (Library, ExecId, ExecId) {
        let mut lib = Library::new();
        let def = lib.add_job_type(JobType::new("j"));
        let a = lib.declare(def).unwrap();
        let b = lib.declare(def).unwrap();
        (lib, a, b)
    }

    #[test]
    fn test_job_numbers_are_stable_and_distinct() {
        let (_, a, b) = ids();
        let mut ds = DataSet::new();
        let s1 = ds.insert_child(DataSet::ROOT, "s1");
        let mut diags = Diagnostics::new();
        let mut numbers = JobNumbers::new(100);

        let first = numbers.calc(a, s1, &mut diags);
        assert_eq!(first, 1);
        assert_eq!(numbers.calc(a, s1, &mut diags), first);
        assert_eq!(numbers.calc(b, s1, &mut diags), 2);
        assert_eq!(numbers.calc(a, DataSet::ROOT, &mut diags), 3);
        assert_eq!(numbers.get(b, s1), Some(2));
        assert_eq!(numbers.get(b, DataSet::ROOT), None);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_job_numbers_wrap_with_warning() {
        let (_, a, b) = ids();
        let mut ds = DataSet::new();
        let nodes: Vec<NodeId> = (0..4).map(|i| ds.insert_child(DataSet::ROOT, &format!("n{}", i))).collect();
        let mut diags = Diagnostics::new();
        let mut numbers = JobNumbers::new(3);

        let got: Vec<u32> = nodes.iter().map(|n| numbers.calc(a, *n, &mut diags)).collect();
        assert_eq!(got, vec![1, 2, 3, 1]);
        assert_eq!(numbers.calc(b, nodes[0], &mut diags), 2);
        assert_eq!(diags.warnings.len(), 1);
        assert!(diags.warnings[0].contains("wrapped after 3"));
    }

    #[test]
    fn test_iterated_nodes_follow_full_path() {
        let (lib, a, _) = ids();
        let mut ds = DataSet::new();
        let s1 = ds.insert_child(DataSet::ROOT, "s1");
        let s2 = ds.insert_child(DataSet::ROOT, "s2");
        ds.insert_child(DataSet::ROOT, "other");

        let config = CompilerConfig::default();
        let mut ctx = CompileContext::new(&config, lib, ds);
        ctx.library.exec_mut(a).path = "s*".to_string();

        assert_eq!(ctx.iterated_nodes(a), vec![s1, s2]);
        assert!(ctx.descendants(DataSet::ROOT).contains(&s2));
    }
}
