// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Compilation of sequences into job specs
//!
//! [`JobSpecCompiler`] crosses the instance tree of a [`Sequence`] with a
//! [`DataSet`] and emits one [`JobSpec`] per job and matched node, with
//! format conversions inserted and wait-for sets computed.
//!
//! [`Sequence`]: crate::model::Sequence
//! [`DataSet`]: crate::dataset::DataSet

mod compiler;
mod context;
mod files;
mod final_jobs;
mod jobspec;
mod waitfor;

pub use compiler::{Checkpoint, Compilation, JobSpecCompiler};
pub use context::JobNumbers;
pub use files::{CONVERSION_INFILE, CONVERSION_OUTFILE};
pub use final_jobs::FinalJobsAnalyzer;
pub use jobspec::{CompiledSequence, JobSpec};
