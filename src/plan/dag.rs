// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! DAG (Directed Acyclic Graph) of compiled jobs
//!
//! Builds a graph with an edge from every waited-for job to the job that
//! waits, validates it, and renders it for humans.

use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};

use crate::compile::CompiledSequence;
use crate::errors::{SeqError, SeqResult};

/// Graph of job numbers
pub struct DagBuilder {
    graph: DiGraph<u32, ()>,
    jnum_to_index: HashMap<u32, NodeIndex>,
    labels: BTreeMap<u32, String>,
}

impl DagBuilder {
    /// Create an empty DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            jnum_to_index: HashMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Build a DAG from compiled job specs
    pub fn build(sequence: &CompiledSequence) -> SeqResult<Self> {
        let mut builder = Self::new();

        // Add all jobs as nodes
        for (jnum, spec) in &sequence.specs {
            let node = builder.graph.add_node(*jnum);
            builder.jnum_to_index.insert(*jnum, node);
            builder.labels.insert(*jnum, spec.name.clone());
        }

        // Add waitfor edges
        for (jnum, spec) in &sequence.specs {
            let job_node = builder.jnum_to_index[jnum];
            for wait in &spec.waitfor {
                match builder.jnum_to_index.get(wait) {
                    Some(wait_node) => {
                        builder.graph.add_edge(*wait_node, job_node, ());
                    }
                    None => tracing::debug!("job {} waits for {} outside this sequence", jnum, wait),
                }
            }
        }

        builder.validate_acyclic()?;

        Ok(builder)
    }

    fn validate_acyclic(&self) -> SeqResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(SeqError::CircularDependency {
                jobs: self.find_cycle_members(cycle.node_id()),
            }),
        }
    }

    /// Labels of the strongly connected component holding `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&start))
            .unwrap_or_else(|| vec![start])
            .into_iter()
            .map(|node| self.label(self.graph[node]))
            .collect()
    }

    fn label(&self, jnum: u32) -> String {
        match self.labels.get(&jnum) {
            Some(name) => format!("{} ({})", jnum, name),
            None => jnum.to_string(),
        }
    }

    /// Job numbers in an order that respects every edge
    pub fn topological_order(&self) -> SeqResult<Vec<u32>> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| SeqError::CircularDependency {
                jobs: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Jobs that must finish before `jnum`
    pub fn dependencies(&self, jnum: u32) -> Option<Vec<u32>> {
        let node = self.jnum_to_index.get(&jnum)?;
        let mut deps: Vec<u32> = self
            .graph
            .neighbors_directed(*node, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        deps.sort_unstable();
        Some(deps)
    }

    /// Jobs waiting for `jnum`
    pub fn dependents(&self, jnum: u32) -> Option<Vec<u32>> {
        let node = self.jnum_to_index.get(&jnum)?;
        let mut deps: Vec<u32> = self
            .graph
            .neighbors_directed(*node, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        deps.sort_unstable();
        Some(deps)
    }

    /// Check if job `a` waits (directly or transitively) for job `b`
    pub fn depends_on(&self, a: u32, b: u32) -> bool {
        let (Some(node_a), Some(node_b)) = (self.jnum_to_index.get(&a), self.jnum_to_index.get(&b))
        else {
            return false;
        };
        has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<(u32, u32)> = self
            .graph
            .edge_references()
            .map(|edge| (self.graph[edge.source()], self.graph[edge.target()]))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for (jnum, name) in &self.labels {
            out.push_str(&format!("    j{}[\"{} {}\"]\n", jnum, jnum, name));
        }
        for (from, to) in self.edges() {
            out.push_str(&format!("    j{} --> j{}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph sequence {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (jnum, name) in &self.labels {
            out.push_str(&format!("    j{} [label=\"{} {}\"];\n", jnum, jnum, name));
        }
        for (from, to) in self.edges() {
            out.push_str(&format!("    j{} -> j{};\n", from, to));
        }

        out.push_str("}\n");
        out
    }

    /// Numbered execution order with each job's waits
    pub fn to_text(&self, sequence: &CompiledSequence) -> SeqResult<String> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, jnum) in order.iter().enumerate() {
            let Some(spec) = sequence.get(*jnum) else {
                continue;
            };
            let deps = self.dependencies(*jnum).unwrap_or_default();

            out.push_str(&format!("{}. [{}] {} ({})", i + 1, jnum, spec.name, spec.jobtype));
            if !deps.is_empty() {
                let deps: Vec<String> = deps.iter().map(u32::to_string).collect();
                out.push_str(&format!(" [waitfor: {}]", deps.join(", ")));
            }
            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}
