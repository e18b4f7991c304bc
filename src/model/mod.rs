// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Definitions, instances and sequences
//!
//! Definitions ([`JobType`], [`BlockDef`]) are authored once. Instances
//! ([`Exec`]) are declared from them into a [`Library`]. A [`Sequence`] ties
//! a root block instance to its global variables.

pub mod definition;
pub mod instance;
pub mod jobtype;
pub mod library;
pub mod sequence;

pub use definition::{Argument, BlockDef, Command, DefId, DefKind, ExecDef, FileSpec, JobType, DIR_ARGUMENT};
pub use instance::{Exec, ExecId, ExecKind};
pub use jobtype::load_job_type_dir;
pub use library::{conversion_job_type, Library};
pub use sequence::Sequence;
