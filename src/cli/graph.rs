// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Graph command - visualize compiled jobs as a graph

use miette::Result;
use std::path::PathBuf;

use super::{load_config, load_dataset, load_library, load_sequence, GraphFormat};
use crate::compile::JobSpecCompiler;
use crate::errors::Diagnostics;
use crate::plan::DagBuilder;
use crate::utils::colors::print_diagnostics;

/// Run the graph command
pub async fn run(
    sequence_path: PathBuf,
    dataset_path: PathBuf,
    jobtypes: Vec<PathBuf>,
    format: GraphFormat,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let mut diags = Diagnostics::new();
    let library = load_library(&config, &jobtypes, &mut diags)?;
    let sequence = load_sequence(&sequence_path, library, &mut diags)?;
    let dataset = load_dataset(&dataset_path, &mut diags)?;

    let compilation = JobSpecCompiler::new(config).compile(&sequence, &dataset);
    diags.merge("compile", compilation.diagnostics);

    // Build DAG
    let dag = DagBuilder::build(&compilation.sequence)?;

    // Output in requested format
    let output = match format {
        GraphFormat::Text => dag.to_text(&compilation.sequence)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    if verbose || !diags.is_clean() {
        print_diagnostics(&diags);
    }

    Ok(())
}
