// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Error types
//!
//! Hard failures are reported as [`SeqError`]. Problems found while reading
//! pipeline text or compiling a sequence are not fatal; they accumulate in
//! [`Diagnostics`] and the caller decides what to do with them.

mod diagnostics;

pub use diagnostics::Diagnostics;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for seqc operations
pub type SeqResult<T> = Result<T, SeqError>;

/// Main error type for seqc
#[derive(Error, Debug, Diagnostic)]
pub enum SeqError {
    // ─────────────────────────────────────────────────────────────────────────
    // Definition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unknown definition '{name}'")]
    #[diagnostic(
        code(seqc::unknown_definition),
        help("Load the job type with --jobtypes or declare it with 'defblock {name}'")
    )]
    UnknownDefinition { name: String },

    #[error("Definition '{name}' is not a job type")]
    #[diagnostic(code(seqc::not_a_job_type))]
    NotAJobType { name: String },

    #[error("Definition '{name}' is not a block")]
    #[diagnostic(code(seqc::not_a_block))]
    NotABlock { name: String },

    #[error("Block '{name}' contains itself")]
    #[diagnostic(
        code(seqc::cyclic_block),
        help("Expansion chain: {chain}")
    )]
    CyclicBlock { name: String, chain: String },

    #[error("Instance '{name}' not found in sequence")]
    #[diagnostic(code(seqc::unknown_instance))]
    UnknownInstance { name: String },

    #[error("Instance name '{name}' matches more than one instance")]
    #[diagnostic(
        code(seqc::ambiguous_instance),
        help("Qualify the name with its enclosing blocks: {candidates}")
    )]
    AmbiguousInstance { name: String, candidates: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Dataset Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Dataset node '{path}' not found")]
    #[diagnostic(
        code(seqc::unknown_dataset_node),
        help("Checkpoint paths are literal, colon separated node names")
    )]
    UnknownDataSetNode { path: String },

    #[error("Variables at '{node}' refer to each other in a cycle")]
    #[diagnostic(
        code(seqc::cyclic_variables),
        help("Variables involved: {names}")
    )]
    CyclicVariables { node: String, names: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Plan Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Circular dependency detected between compiled jobs")]
    #[diagnostic(
        code(seqc::circular_dependency),
        help("Review the waitfor sets of the jobs involved")
    )]
    CircularDependency { jobs: Vec<String> },

    #[error("Invalid checkpoint '{spec}'")]
    #[diagnostic(
        code(seqc::invalid_checkpoint),
        help("Use INSTANCE@DATASET_PATH, for example smooth@s1:run1 or pipeline001/smooth@s2")
    )]
    InvalidCheckpoint { spec: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(seqc::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(seqc::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(seqc::io_error))]
    Io { message: String },

    #[error("YAML error: {message}")]
    #[diagnostic(code(seqc::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(seqc::json_error))]
    Json { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(seqc::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for SeqError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for SeqError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for SeqError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<glob::PatternError> for SeqError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl SeqError {
    /// Read a whole file, mapping failures to [`SeqError::FileReadError`]
    pub fn read_file(path: &std::path::Path) -> SeqResult<String> {
        std::fs::read_to_string(path).map_err(|e| Self::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}
