// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Hierarchical dataset of inherited variables
//!
//! A dataset is a tree of named nodes. Each node carries members (name/value
//! pairs) and sees the members of all its ancestors, with the nearest
//! definition winning. Jobs address nodes with colon separated paths whose
//! segments may contain `*`.
//!
//! Nodes live in an arena owned by [`DataSet`]; a [`NodeId`] is both the
//! arena index and the node's creation order.

mod parse;

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::{SeqError, SeqResult};
use crate::utils::pattern::{is_pattern, matches};
use crate::utils::vars::{self, VarMap, DEFAULT_MAX_PASSES};

/// Name of the root node
pub const ROOT_NAME: &str = "DataSet";

/// Identifier of a dataset node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A name/value pair attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    members: Vec<Member>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            members: Vec::new(),
        }
    }
}

/// Variables of a node after substitution
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub vars: VarMap,
    /// Names still referring to each other after the pass limit
    pub unresolved: Vec<String>,
}

/// Dataset tree
#[derive(Debug, Clone)]
pub struct DataSet {
    nodes: Vec<Node>,
}

impl DataSet {
    /// The root node of every dataset
    pub const ROOT: NodeId = NodeId(0);

    /// Create a dataset holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(ROOT_NAME, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    /// Number of nodes ever created, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty() && self.nodes[0].members.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn members(&self, id: NodeId) -> &[Member] {
        &self.node(id).members
    }

    /// Names from the root (exclusive) down to `id`
    pub fn path_segments(&self, id: NodeId) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let parent = self.parent(node);
            if parent.is_some() {
                segments.push(self.name(node));
            }
            current = parent;
        }
        segments.reverse();
        segments
    }

    /// Colon separated path from the root, e.g. `s1:run1`
    pub fn path(&self, id: NodeId) -> String {
        self.path_segments(id).join(":")
    }

    /// Path including the root name, e.g. `DataSet:s1:run1`
    pub fn long_name(&self, id: NodeId) -> String {
        let mut segments = self.path_segments(id);
        segments.insert(0, self.name(Self::ROOT));
        segments.join(":")
    }

    /// Find a direct child by name
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.name(*child) == name)
    }

    /// Add a child, or return the existing child of that name
    pub fn insert_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.child_named(parent, name) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, Some(parent)));
        self.node_mut(parent).children.push(id);
        id
    }

    /// Create every node along a colon separated path
    pub fn insert_path(&mut self, from: NodeId, path: &str) -> NodeId {
        path.split(':')
            .filter(|segment| !segment.is_empty())
            .fold(from, |node, segment| self.insert_child(node, segment))
    }

    /// Detach a child and its subtree
    ///
    /// Returns false when `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.node_mut(parent).children;
        let Some(pos) = children.iter().position(|c| *c == child) else {
            return false;
        };
        children.remove(pos);
        self.node_mut(child).parent = None;
        true
    }

    /// Set a member on a node
    ///
    /// With `overwrite` false an existing value is kept.
    pub fn insert_member(&mut self, id: NodeId, name: &str, value: &str, overwrite: bool) {
        let members = &mut self.node_mut(id).members;
        match members.iter().position(|m| m.name == name) {
            Some(pos) => {
                if overwrite {
                    members[pos].value = value.to_string();
                }
            }
            None => members.push(Member {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Remove a member from this node only
    pub fn remove_member(&mut self, id: NodeId, name: &str) -> Option<String> {
        let members = &mut self.node_mut(id).members;
        let pos = members.iter().position(|m| m.name == name)?;
        Some(members.remove(pos).value)
    }

    /// Look up a member, walking up through ancestors when `recurse` is set
    pub fn get_member(&self, id: NodeId, name: &str, recurse: bool) -> Option<&Member> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(member) = self.members(node).iter().find(|m| m.name == name) {
                return Some(member);
            }
            if !recurse {
                return None;
            }
            current = self.parent(node);
        }
        None
    }

    /// Literal path lookup; empty segments are skipped
    pub fn get_child(&self, id: NodeId, path: &str) -> Option<NodeId> {
        path.split(':')
            .filter(|segment| !segment.is_empty())
            .try_fold(id, |node, segment| self.child_named(node, segment))
    }

    /// Every node matched by a path whose segments may contain `*`
    pub fn get_children(&self, id: NodeId, path: &str) -> Vec<NodeId> {
        let segments: Vec<&str> = path.split(':').filter(|s| !s.is_empty()).collect();
        let mut found = BTreeSet::new();
        self.collect_matches(id, &segments, &mut found);
        found.into_iter().collect()
    }

    fn collect_matches(&self, id: NodeId, segments: &[&str], found: &mut BTreeSet<NodeId>) {
        let Some((segment, rest)) = segments.split_first() else {
            found.insert(id);
            return;
        };

        if is_pattern(segment) {
            for child in self.children(id) {
                if matches(self.name(*child), segment) {
                    self.collect_matches(*child, rest, found);
                }
            }
        } else if let Some(child) = self.child_named(id, segment) {
            self.collect_matches(child, rest, found);
        }
    }

    /// A node and everything below it
    pub fn descendants(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if out.insert(node) {
                stack.extend(self.children(node).iter().copied());
            }
        }
        out
    }

    /// Whether `ancestor` is `id` or lies above it
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// All members visible at a node, nearest definition winning
    pub fn inherited_members(&self, id: NodeId) -> VarMap {
        let mut map = VarMap::new();
        let mut current = Some(id);
        while let Some(node) = current {
            for member in self.members(node) {
                map.entry(member.name.clone())
                    .or_insert_with(|| member.value.clone());
            }
            current = self.parent(node);
        }
        map
    }

    /// Inherited members substituted into themselves, stopping after
    /// `max_passes`
    pub fn resolve(&self, id: NodeId, max_passes: usize) -> Resolution {
        let mut vars = self.inherited_members(id);
        let unresolved = vars::resolve_fixed_point(&mut vars, max_passes);
        Resolution { vars, unresolved }
    }

    /// Fully substituted variable map of a node
    pub fn to_map(&self, id: NodeId) -> SeqResult<VarMap> {
        let resolution = self.resolve(id, DEFAULT_MAX_PASSES);
        if resolution.unresolved.is_empty() {
            Ok(resolution.vars)
        } else {
            Err(SeqError::CyclicVariables {
                node: self.long_name(id),
                names: resolution.unresolved.join(", "),
            })
        }
    }

    /// Substitute a node's variables into a string
    pub fn resolved_string(&self, id: NodeId, value: &str) -> String {
        vars::substituted(value, &self.resolve(id, DEFAULT_MAX_PASSES).vars)
    }

    /// Indented dump of the tree and its members
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_node(Self::ROOT, 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{}{}\n", indent, self.name(id)));
        for member in self.members(id) {
            out.push_str(&format!("{}  {}={}\n", indent, member.name, member.value));
        }
        for child in self.children(id) {
            self.render_node(*child, depth + 1, out);
        }
    }
}

impl Default for DataSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DataSet, NodeId, NodeId, NodeId) {
        let mut ds = DataSet::new();
        ds.insert_member(DataSet::ROOT, "DIR", "/data", true);
        let s1 = ds.insert_child(DataSet::ROOT, "s1");
        let run1 = ds.insert_child(s1, "run1");
        let run2 = ds.insert_child(s1, "run2");
        let s2 = ds.insert_child(DataSet::ROOT, "s2");
        ds.insert_child(s2, "run1");
        ds.insert_member(s1, "DIR", "/data/s1", true);
        (ds, s1, run1, run2)
    }

    #[test]
    fn test_member_inheritance_nearest_wins() {
        let (ds, s1, run1, _) = sample();
        assert_eq!(ds.get_member(run1, "DIR", true).unwrap().value, "/data/s1");
        assert!(ds.get_member(run1, "DIR", false).is_none());
        assert_eq!(ds.get_member(DataSet::ROOT, "DIR", true).unwrap().value, "/data");
        assert_eq!(ds.get_member(s1, "DIR", false).unwrap().value, "/data/s1");
        assert!(ds.get_member(run1, "nope", true).is_none());
    }

    #[test]
    fn test_insert_member_without_overwrite() {
        let mut ds = DataSet::new();
        ds.insert_member(DataSet::ROOT, "x", "1", true);
        ds.insert_member(DataSet::ROOT, "x", "2", false);
        assert_eq!(ds.get_member(DataSet::ROOT, "x", false).unwrap().value, "1");
        ds.insert_member(DataSet::ROOT, "x", "3", true);
        assert_eq!(ds.get_member(DataSet::ROOT, "x", false).unwrap().value, "3");
    }

    #[test]
    fn test_remove_member_does_not_cascade() {
        let (mut ds, s1, run1, _) = sample();
        ds.insert_member(run1, "DIR", "/override", true);
        assert_eq!(ds.remove_member(s1, "DIR").as_deref(), Some("/data/s1"));
        assert_eq!(ds.get_member(run1, "DIR", true).unwrap().value, "/override");
        assert_eq!(ds.remove_member(s1, "DIR"), None);
    }

    #[test]
    fn test_get_child_literal() {
        let (ds, s1, run1, _) = sample();
        assert_eq!(ds.get_child(DataSet::ROOT, "s1"), Some(s1));
        assert_eq!(ds.get_child(DataSet::ROOT, "s1:run1"), Some(run1));
        assert_eq!(ds.get_child(DataSet::ROOT, ":s1::run1"), Some(run1));
        assert_eq!(ds.get_child(s1, ""), Some(s1));
        assert_eq!(ds.get_child(DataSet::ROOT, "s1:*"), None);
    }

    #[test]
    fn test_get_children_wildcards() {
        let (ds, s1, run1, run2) = sample();
        let s2 = ds.get_child(DataSet::ROOT, "s2").unwrap();
        let s2_run1 = ds.get_child(s2, "run1").unwrap();

        assert_eq!(ds.get_children(DataSet::ROOT, "*"), vec![s1, s2]);
        assert_eq!(ds.get_children(DataSet::ROOT, "s1:run*"), vec![run1, run2]);
        assert_eq!(ds.get_children(DataSet::ROOT, "*:run1"), vec![run1, s2_run1]);
        assert_eq!(ds.get_children(DataSet::ROOT, ""), vec![DataSet::ROOT]);
        assert!(ds.get_children(DataSet::ROOT, "s3").is_empty());
    }

    #[test]
    fn test_get_children_deduplicates() {
        let (ds, s1, _, _) = sample();
        let hits = ds.get_children(DataSet::ROOT, "s1");
        assert_eq!(hits, vec![s1]);
        let all = ds.get_children(DataSet::ROOT, "*:*");
        let unique: BTreeSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_to_map_fixed_point() {
        let mut ds = DataSet::new();
        ds.insert_member(DataSet::ROOT, "BASE", "/data", true);
        ds.insert_member(DataSet::ROOT, "DIR", "$(BASE)/$(SUBJ)", true);
        let s1 = ds.insert_child(DataSet::ROOT, "s1");
        ds.insert_member(s1, "SUBJ", "s1", true);

        let map = ds.to_map(s1).unwrap();
        assert_eq!(map["DIR"], "/data/s1");
        assert_eq!(ds.resolved_string(s1, "$(DIR)/t1.img"), "/data/s1/t1.img");
    }

    #[test]
    fn test_to_map_reports_cycles() {
        let mut ds = DataSet::new();
        ds.insert_member(DataSet::ROOT, "A", "$(B)", true);
        ds.insert_member(DataSet::ROOT, "B", "$(A)", true);

        let err = ds.to_map(DataSet::ROOT).unwrap_err();
        assert!(matches!(err, SeqError::CyclicVariables { .. }));

        let resolution = ds.resolve(DataSet::ROOT, 4);
        assert_eq!(resolution.unresolved, vec!["A", "B"]);
    }

    #[test]
    fn test_descendants_and_remove_child() {
        let (mut ds, s1, run1, run2) = sample();
        let below: Vec<NodeId> = ds.descendants(s1).into_iter().collect();
        assert_eq!(below, vec![s1, run1, run2]);

        assert!(ds.remove_child(DataSet::ROOT, s1));
        assert!(!ds.remove_child(DataSet::ROOT, s1));
        assert!(ds.get_child(DataSet::ROOT, "s1:run1").is_none());
        assert_eq!(ds.get_children(DataSet::ROOT, "*").len(), 1);
    }

    #[test]
    fn test_names_and_paths() {
        let (ds, _, run1, _) = sample();
        assert_eq!(ds.path(run1), "s1:run1");
        assert_eq!(ds.long_name(run1), "DataSet:s1:run1");
        assert_eq!(ds.long_name(DataSet::ROOT), "DataSet");
        assert!(ds.path(DataSet::ROOT).is_empty());
        assert!(ds.is_ancestor(DataSet::ROOT, run1));
        assert!(!ds.is_ancestor(run1, DataSet::ROOT));
    }

    #[test]
    fn test_insert_child_reuses_names() {
        let mut ds = DataSet::new();
        let a = ds.insert_child(DataSet::ROOT, "a");
        assert_eq!(ds.insert_child(DataSet::ROOT, "a"), a);
        let deep = ds.insert_path(DataSet::ROOT, "a:b:c");
        assert_eq!(ds.get_child(DataSet::ROOT, "a:b:c"), Some(deep));
        assert_eq!(ds.children(DataSet::ROOT).len(), 1);
    }

    #[test]
    fn test_render_tree() {
        let (ds, _, _, _) = sample();
        let tree = ds.render_tree();
        assert!(tree.starts_with("DataSet\n  DIR=/data\n"));
        assert!(tree.contains("\n  s1\n    DIR=/data/s1\n    run1\n"));
    }
}
