// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Declared instances of definitions
//!
//! Instances form a tree: blocks own their children by id and every
//! instance points back to its parent block. Dependencies are ids of
//! sibling instances.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::definition::DefId;

/// Identifier of an instance inside a [`Library`](super::Library)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExecId(pub(crate) usize);

impl fmt::Display for ExecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec#{}", self.0)
    }
}

/// Variant payload of an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecKind {
    Job,
    Block { execs: Vec<ExecId> },
}

/// An instance of a job type or block definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exec {
    pub id: ExecId,
    pub name: String,
    /// Dataset path, relative to the node the parent block runs on
    pub path: String,
    /// Argument overrides
    pub data: BTreeMap<String, String>,
    pub depends: Vec<ExecId>,
    pub parent: Option<ExecId>,
    pub def: DefId,
    pub kind: ExecKind,
}

impl Exec {
    pub fn is_job(&self) -> bool {
        matches!(self.kind, ExecKind::Job)
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, ExecKind::Block { .. })
    }

    /// Children of a block; empty for a job
    pub fn execs(&self) -> &[ExecId] {
        match &self.kind {
            ExecKind::Block { execs } => execs,
            ExecKind::Job => &[],
        }
    }
}
