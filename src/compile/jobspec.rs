// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Compiler output

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::SeqResult;
use crate::plan::sort::{Dependent, TopologicalSorter};

/// One fully resolved job, ready for a batch queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub jobtype: String,
    pub jnum: u32,
    pub arguments: BTreeMap<String, String>,
    /// Working directory
    pub dirname: String,
    pub logdir: String,
    /// Job numbers that must finish first
    #[serde(default)]
    pub waitfor: BTreeSet<u32>,
}

impl Dependent for JobSpec {
    type Key = u32;

    fn key(&self) -> u32 {
        self.jnum
    }

    fn dependencies(&self) -> Vec<u32> {
        self.waitfor.iter().copied().collect()
    }
}

/// Every job spec produced for one sequence over one dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledSequence {
    pub name: String,
    pub priority: String,
    /// Working directory of the sequence itself
    pub seqdir: String,
    pub specs: BTreeMap<u32, JobSpec>,
}

impl CompiledSequence {
    pub fn new(name: &str, priority: &str, seqdir: &str) -> Self {
        Self {
            name: name.to_string(),
            priority: priority.to_string(),
            seqdir: seqdir.to_string(),
            specs: BTreeMap::new(),
        }
    }

    pub fn get(&self, jnum: u32) -> Option<&JobSpec> {
        self.specs.get(&jnum)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs grouped by dependency depth, job number order within a depth
    pub fn ordered_specs(&self) -> Vec<&JobSpec> {
        TopologicalSorter::sort(self.specs.values().collect())
    }

    /// Specs of a given job type, in job number order
    pub fn specs_of(&self, jobtype: &str) -> Vec<&JobSpec> {
        self.specs.values().filter(|s| s.jobtype == jobtype).collect()
    }

    pub fn to_json(&self) -> SeqResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> SeqResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
