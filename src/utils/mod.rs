// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Utility modules
//!
//! Text handling, wildcard matching, variable substitution and terminal
//! styling shared across the crate.

pub mod colors;
pub mod pattern;
pub mod text;
pub mod vars;

pub use pattern::matches;
pub use vars::VarMap;
