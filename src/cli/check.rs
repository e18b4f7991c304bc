// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Check command - report problems in a sequence and dataset

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_config, load_dataset, load_library, load_sequence};
use crate::compile::JobSpecCompiler;
use crate::errors::Diagnostics;
use crate::utils::colors::{print_diagnostics, print_info, print_section, print_success, print_warning};

/// Run the check command
pub async fn run(
    sequence_path: PathBuf,
    dataset_path: Option<PathBuf>,
    jobtypes: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    println!("{}", "Checking sequence...".bold());
    println!();

    let config = load_config(config_path.as_deref())?;
    let mut diags = Diagnostics::new();
    let library = load_library(&config, &jobtypes, &mut diags)?;
    let sequence = load_sequence(&sequence_path, library, &mut diags)?;
    print_success(&format!("Read {}", sequence_path.display()));

    if !sequence.execs_are_sorted() {
        print_warning("top-level instances are not listed in dependency order");
    }

    if let Some(path) = dataset_path {
        let dataset = load_dataset(&path, &mut diags)?;
        print_success(&format!("Read {} ({} nodes)", path.display(), dataset.len()));

        let compilation = JobSpecCompiler::new(config).compile(&sequence, &dataset);
        print_success(&format!("Compiled {} job specs", compilation.sequence.len()));
        diags.merge("compile", compilation.diagnostics);
    }

    if verbose {
        print_section("Sequence summary");
        let name = if sequence.name().is_empty() {
            "(unnamed)"
        } else {
            sequence.name()
        };
        print_info(&format!("Name: {}", name));
        print_info(&format!("Priority: {}", sequence.priority()));
        print_info(&format!("Block definitions: {}", sequence.definitions().len()));
        let library = sequence.library();
        for exec in library.exec(sequence.root()).execs() {
            print_info(&library.instance_line(*exec).dimmed().to_string());
        }
    }

    println!();
    print_diagnostics(&diags);

    if !diags.is_clean() {
        Err(miette::miette!("Sequence check failed"))
    } else if diags.has_warnings() {
        println!("{}", "Sequence is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Sequence is valid!".green().bold());
        Ok(())
    }
}
