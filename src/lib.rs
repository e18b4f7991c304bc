// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! # seqc - Pipeline Sequence Compiler
//!
//! `seqc` expands hierarchical pipeline templates over a dataset tree and
//! produces a flat list of batch jobs with numbers, arguments and
//! dependencies.
//!
//! ## Features
//!
//! - **Dataset trees** - nested nodes with inherited `$(VAR)` members
//! - **Block templates** - reusable groups of jobs bound to dataset paths
//! - **Dependency analysis** - `waitfor` sets derived from template order
//! - **File conversion** - format conversion jobs inserted on demand
//! - **Checkpoints** - compile only the jobs between two instances
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a pipeline
//! seqc check study.seq -j jobtypes
//!
//! # Compile it for a dataset
//! seqc compile study.seq -d subjects.ds -j jobtypes -f json
//!
//! # Show the job graph
//! seqc graph study.seq -d subjects.ds -j jobtypes -f mermaid
//! ```

pub mod cli;
pub mod compile;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod model;
pub mod plan;
pub mod utils;

// Re-export commonly used types
pub use compile::{CompiledSequence, JobSpec, JobSpecCompiler};
pub use config::CompilerConfig;
pub use dataset::DataSet;
pub use errors::{Diagnostics, SeqError, SeqResult};
pub use model::{Library, Sequence};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
