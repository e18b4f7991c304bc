// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Ordering and reachability over instances and compiled jobs

pub mod dag;
pub mod resolver;
pub mod sort;

pub use dag::DagBuilder;
pub use resolver::{common_ancestor, DependencyResolver};
pub use sort::{Dependent, TopologicalSorter};
