// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Compile command - turn a sequence into job specs

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_config, load_dataset, load_library, load_sequence, OutputFormat};
use crate::compile::{Checkpoint, CompiledSequence, JobSpecCompiler};
use crate::errors::Diagnostics;
use crate::utils::colors::print_diagnostics;

/// Options of the compile command
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub sequence: PathBuf,
    pub datasets: Vec<PathBuf>,
    pub jobtypes: Vec<PathBuf>,
    pub format: OutputFormat,
    pub begin: Option<String>,
    pub end: Option<String>,
    pub strict: bool,
    pub config: Option<PathBuf>,
}

/// Run the compile command
pub async fn run(options: CompileOptions, verbose: bool) -> Result<()> {
    let config = load_config(options.config.as_deref())?;
    let mut diags = Diagnostics::new();
    let library = load_library(&config, &options.jobtypes, &mut diags)?;
    let sequence = Arc::new(load_sequence(&options.sequence, library, &mut diags)?);
    let compiler = Arc::new(JobSpecCompiler::new(config));

    // Each dataset compiles on its own blocking task
    let mut tasks = Vec::with_capacity(options.datasets.len());
    for path in &options.datasets {
        let dataset = load_dataset(path, &mut diags)?;
        let begin = options
            .begin
            .as_deref()
            .map(|text| Checkpoint::parse(text, &sequence, &dataset))
            .transpose()?;
        let end = options
            .end
            .as_deref()
            .map(|text| Checkpoint::parse(text, &sequence, &dataset))
            .transpose()?;

        let (sequence, compiler) = (Arc::clone(&sequence), Arc::clone(&compiler));
        let task = tokio::task::spawn_blocking(move || {
            compiler.compile_between(&sequence, &dataset, begin.as_ref(), end.as_ref())
        });
        tasks.push((path.clone(), task));
    }

    let mut compiled = Vec::with_capacity(tasks.len());
    for (path, task) in tasks {
        let compilation = task
            .await
            .map_err(|e| miette::miette!("Compilation of {} failed: {}", path.display(), e))?;
        if verbose {
            eprintln!(
                "{} {} job specs from {}",
                "→".blue(),
                compilation.sequence.len(),
                path.display()
            );
        }
        diags.merge(&path.display().to_string(), compilation.diagnostics);
        compiled.push(compilation.sequence);
    }

    let output = match options.format {
        OutputFormat::Text => compiled.iter().map(render_text).collect::<Vec<_>>().join("\n"),
        OutputFormat::Json => match compiled.as_slice() {
            [single] => single.to_json()?,
            all => serde_json::to_string_pretty(all)
                .map_err(|e| miette::miette!("Failed to serialize job specs: {}", e))?,
        },
        OutputFormat::Yaml => compiled
            .iter()
            .map(CompiledSequence::to_yaml)
            .collect::<Result<Vec<_>, _>>()?
            .join("---\n"),
    };
    println!("{}", output.trim_end());

    print_diagnostics(&diags);

    if options.strict && !diags.is_clean() {
        return Err(miette::miette!(
            "Compilation reported {} error(s)",
            diags.errors.len()
        ));
    }

    Ok(())
}

/// Human readable job list in dependency order
fn render_text(sequence: &CompiledSequence) -> String {
    let mut out = format!(
        "{} {} (priority {}, {} jobs)\n",
        "Sequence".bold(),
        sequence.name,
        sequence.priority,
        sequence.len()
    );

    for spec in sequence.ordered_specs() {
        out.push_str(&format!("  [{}] {} ({})", spec.jnum, spec.name.bold(), spec.jobtype));
        if !spec.waitfor.is_empty() {
            let waits: Vec<String> = spec.waitfor.iter().map(u32::to_string).collect();
            out.push_str(&format!(" waitfor {}", waits.join(" ")));
        }
        out.push('\n');
        for (name, value) in &spec.arguments {
            out.push_str(&format!("      {}={}\n", name, value));
        }
        out.push_str(&format!("      {}\n", format!("dir {} logs {}", spec.dirname, spec.logdir).dimmed()));
    }

    out
}
