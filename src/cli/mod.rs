// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for seqc.

pub mod check;
pub mod compile;
pub mod fmt;
pub mod graph;
pub mod tree;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::CompilerConfig;
use crate::dataset::DataSet;
use crate::errors::Diagnostics;
use crate::model::{load_job_type_dir, Library, Sequence};

/// Pipeline sequence compiler
///
/// Expand pipeline templates over dataset trees into batch job lists.
#[derive(Parser, Debug)]
#[clap(
    name = "seqc",
    version,
    about = "Compile pipeline templates over dataset trees into batch job lists",
    long_about = None,
    after_help = "Examples:\n\
        seqc check study.seq -j jobtypes           Check a pipeline for problems\n\
        seqc compile study.seq -d subjects.ds      Compile jobs for a dataset\n\
        seqc graph study.seq -d subjects.ds -f dot Show the job graph\n\
        seqc tree subjects.ds                      Show a dataset tree\n\n\
        See 'seqc <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (defaults to .seqc.yaml in the current directory)
    #[clap(long, global = true, value_name = "FILE", env = "SEQC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a sequence into job specs
    Compile {
        /// Pipeline file
        sequence: PathBuf,

        /// Dataset files; each one is compiled separately
        #[clap(short, long = "dataset", required = true, value_name = "FILE")]
        datasets: Vec<PathBuf>,

        /// Extra directories of *.vjt job type files
        #[clap(short = 'j', long = "jobtypes", value_name = "DIR")]
        jobtypes: Vec<PathBuf>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,

        /// Keep only jobs after this checkpoint
        #[clap(long, value_name = "INSTANCE@PATH")]
        begin: Option<String>,

        /// Keep only jobs before this checkpoint
        #[clap(long, value_name = "INSTANCE@PATH")]
        end: Option<String>,

        /// Fail when compilation reports errors
        #[clap(long)]
        strict: bool,
    },

    /// Check a sequence (and optionally a dataset) for problems
    Check {
        /// Pipeline file
        sequence: PathBuf,

        /// Dataset file
        #[clap(short, long)]
        dataset: Option<PathBuf>,

        /// Extra directories of *.vjt job type files
        #[clap(short = 'j', long = "jobtypes", value_name = "DIR")]
        jobtypes: Vec<PathBuf>,
    },

    /// Show compiled jobs as a graph
    Graph {
        /// Pipeline file
        sequence: PathBuf,

        /// Dataset file
        #[clap(short, long)]
        dataset: PathBuf,

        /// Extra directories of *.vjt job type files
        #[clap(short = 'j', long = "jobtypes", value_name = "DIR")]
        jobtypes: Vec<PathBuf>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Show a dataset tree with its members
    Tree {
        /// Dataset file
        dataset: PathBuf,

        /// Show resolved variables of each node
        #[clap(short, long)]
        resolved: bool,
    },

    /// Print a sequence in normalized form
    Fmt {
        /// Pipeline file
        sequence: PathBuf,

        /// Extra directories of *.vjt job type files
        #[clap(short = 'j', long = "jobtypes", value_name = "DIR")]
        jobtypes: Vec<PathBuf>,
    },
}

/// Output format for compiled jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Configuration from `--config` or the current directory
pub(crate) fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(miette::miette!("Config file not found: {}", path.display()));
            }
            CompilerConfig::load(path)?
        }
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
            CompilerConfig::load_from_project(&cwd)?
        }
    };
    Ok(config)
}

/// Built-in job types plus every configured and requested job type directory
pub(crate) fn load_library(
    config: &CompilerConfig,
    extra_dirs: &[PathBuf],
    diags: &mut Diagnostics,
) -> Result<Library> {
    let mut library = Library::with_builtins(&config.conversion_job_type);

    for dir in config.jobtype_dirs.iter().chain(extra_dirs) {
        if !dir.is_dir() {
            return Err(miette::miette!("Job type directory not found: {}", dir.display()));
        }
        let found = load_job_type_dir(&mut library, dir)?;
        diags.merge("", found);
    }

    Ok(library)
}

pub(crate) fn load_sequence(path: &Path, library: Library, diags: &mut Diagnostics) -> Result<Sequence> {
    if !path.exists() {
        return Err(miette::miette!("Sequence file not found: {}", path.display()));
    }
    let (sequence, found) = Sequence::from_file(path, library)?;
    diags.merge(&path.display().to_string(), found);
    Ok(sequence)
}

pub(crate) fn load_dataset(path: &Path, diags: &mut Diagnostics) -> Result<DataSet> {
    if !path.exists() {
        return Err(miette::miette!("Dataset file not found: {}", path.display()));
    }
    let (dataset, found) = DataSet::from_file(path)?;
    diags.merge(&path.display().to_string(), found);
    Ok(dataset)
}
