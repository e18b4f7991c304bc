// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Wait-for sets
//!
//! A job waits for the final jobs of everything it depends on, but only at
//! the dataset nodes it shares with them. Two jobs in the same block with
//! the same path pair up node for node. Otherwise the common part of both
//! dataset paths picks an ancestor node of the current one, and the job
//! waits for every run of the final job below that node.

use std::collections::BTreeSet;

use super::context::CompileContext;
use crate::dataset::{DataSet, NodeId};
use crate::model::ExecId;
use crate::plan::resolver::common_ancestor;
use crate::utils::pattern::segments_agree;

impl CompileContext<'_> {
    /// Job numbers `job` at `node` has to wait for
    pub(crate) fn compute_waitfor(&mut self, job: ExecId, node: NodeId, extra: &[ExecId]) -> BTreeSet<u32> {
        let mut deps = self.library.effective_depends(job).to_vec();
        deps.extend_from_slice(extra);

        let mut waitfor = BTreeSet::new();
        for dep in deps {
            for target in self.final_jobs(dep) {
                for target_node in self.wait_nodes(job, node, target) {
                    waitfor.insert(self.calc_job_num(target, target_node));
                }
            }
        }
        waitfor
    }

    fn wait_nodes(&mut self, job: ExecId, node: NodeId, target: ExecId) -> Vec<NodeId> {
        let (ours, theirs) = (self.library.exec(job), self.library.exec(target));
        if ours.parent == theirs.parent && ours.path == theirs.path {
            return vec![node];
        }

        if common_ancestor(&self.library, job, target).is_none() {
            let message = format!(
                "'{}' and '{}' share no enclosing block",
                self.library.exec(job).name,
                self.library.exec(target).name
            );
            self.diags.add_error(&message);
        }

        let our_path = self.library.full_path_segments(job);
        let their_path = self.library.full_path_segments(target);
        let shared = our_path
            .iter()
            .zip(&their_path)
            .take_while(|(a, b)| segments_agree(a, b))
            .count();

        let anchor = self.shared_node(node, &their_path[..shared]);
        let candidates = self.iterated_nodes(target);
        let below = self.descendants(anchor);
        candidates.into_iter().filter(|n| below.contains(n)).collect()
    }

    /// Ancestor of `node` reached by following its own path while it agrees
    /// with `prefix`
    fn shared_node(&self, node: NodeId, prefix: &[String]) -> NodeId {
        let mut anchor = DataSet::ROOT;
        for (segment, pattern) in self.dataset.path_segments(node).into_iter().zip(prefix) {
            if !segments_agree(segment, pattern) {
                break;
            }
            match self.dataset.child_named(anchor, segment) {
                Some(child) => anchor = child,
                None => break,
            }
        }
        anchor
    }
}
