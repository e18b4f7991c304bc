// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Exit points of blocks
//!
//! Waiting for a block means waiting for its final jobs: the jobs inside it
//! that no other child of the same block waits for.

use std::collections::{BTreeSet, HashMap};

use crate::model::{ExecId, ExecKind, Library};

/// Memoized final-job sets
#[derive(Debug, Default)]
pub struct FinalJobsAnalyzer {
    memo: HashMap<ExecId, BTreeSet<ExecId>>,
}

impl FinalJobsAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A job is its own final set. A block's final set is the union of its
    /// children's final sets minus the final sets of everything those
    /// children wait for.
    pub fn final_jobs(&mut self, library: &Library, e: ExecId) -> BTreeSet<ExecId> {
        if let Some(known) = self.memo.get(&e) {
            return known.clone();
        }

        let result = match &library.exec(e).kind {
            ExecKind::Job => BTreeSet::from([e]),
            ExecKind::Block { execs } => {
                let mut finals = BTreeSet::new();
                for child in execs {
                    finals.extend(self.final_jobs(library, *child));
                }
                for child in execs {
                    for dep in &library.exec(*child).depends {
                        for waited in self.final_jobs(library, *dep) {
                            finals.remove(&waited);
                        }
                    }
                }
                finals
            }
        };

        self.memo.insert(e, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockDef, JobType};

    struct Fixture {
        lib: Library,
        block: ExecId,
    }

    /// Block with children a, b, c where b waits a; `a_last` declares a
    /// after b in the template
    fn fixture(a_last: bool) -> Fixture {
        let mut lib = Library::new();
        let a = lib.add_job_type(JobType::new("a"));
        let b = lib.add_job_type(JobType::new("b"));
        let c = lib.add_job_type(JobType::new("c"));
        let def = lib.add_block_def(BlockDef::new("blk"));

        let ta = lib.declare(a).unwrap();
        let tb = lib.declare(b).unwrap();
        let tc = lib.declare(c).unwrap();
        lib.exec_mut(tb).depends.push(ta);

        let order = if a_last { [tb, ta, tc] } else { [ta, tb, tc] };
        for t in order {
            lib.push_template(def, t).unwrap();
        }
        let block = lib.declare(def).unwrap();
        Fixture { lib, block }
    }

    fn names(lib: &Library, set: &BTreeSet<ExecId>) -> Vec<String> {
        let mut names: Vec<String> = set.iter().map(|e| lib.exec(*e).name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_job_is_its_own_final_set() {
        let f = fixture(false);
        let job = f.lib.exec(f.block).execs()[0];
        let mut analyzer = FinalJobsAnalyzer::new();
        assert_eq!(analyzer.final_jobs(&f.lib, job), BTreeSet::from([job]));
    }

    #[test]
    fn test_block_final_set_is_its_sinks() {
        let f = fixture(false);
        let mut analyzer = FinalJobsAnalyzer::new();
        let finals = analyzer.final_jobs(&f.lib, f.block);
        assert_eq!(names(&f.lib, &finals), vec!["b", "c"]);
    }

    #[test]
    fn test_declaration_order_does_not_matter() {
        let f = fixture(true);
        let mut analyzer = FinalJobsAnalyzer::new();
        let finals = analyzer.final_jobs(&f.lib, f.block);
        assert_eq!(names(&f.lib, &finals), vec!["b", "c"]);
    }

    #[test]
    fn test_no_final_job_is_waited_on_by_a_sibling() {
        let f = fixture(false);
        let mut analyzer = FinalJobsAnalyzer::new();
        let finals = analyzer.final_jobs(&f.lib, f.block);
        for child in f.lib.exec(f.block).execs() {
            for dep in &f.lib.exec(*child).depends {
                assert!(!finals.contains(dep));
            }
        }
    }

    #[test]
    fn test_nested_block_exposes_inner_sinks() {
        let mut f = fixture(false);
        let outer = f.lib.add_block_def(BlockDef::new("outer"));
        let z = f.lib.add_job_type(JobType::new("z"));
        let inner_def = f.lib.exec(f.block).def;

        let inner = f.lib.declare(inner_def).unwrap();
        let tz = f.lib.declare(z).unwrap();
        f.lib.push_template(outer, inner).unwrap();
        f.lib.push_template(outer, tz).unwrap();
        let top = f.lib.declare(outer).unwrap();

        let mut analyzer = FinalJobsAnalyzer::new();
        let finals = analyzer.final_jobs(&f.lib, top);
        assert_eq!(names(&f.lib, &finals), vec!["b", "c", "z"]);

        // z waiting on the inner block hides all of the block's jobs
        let copies = f.lib.exec(top).execs().to_vec();
        f.lib.exec_mut(copies[1]).depends.push(copies[0]);
        let mut analyzer = FinalJobsAnalyzer::new();
        let finals = analyzer.final_jobs(&f.lib, top);
        assert_eq!(names(&f.lib, &finals), vec!["z"]);
    }
}
