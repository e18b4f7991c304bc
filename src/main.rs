// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! seqc - Pipeline Sequence Compiler
//!
//! Expand pipeline templates over dataset trees into batch job lists.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqc::cli::compile::CompileOptions;
use seqc::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seqc=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Compile {
            sequence,
            datasets,
            jobtypes,
            format,
            begin,
            end,
            strict,
        } => {
            let options = CompileOptions {
                sequence,
                datasets,
                jobtypes,
                format,
                begin,
                end,
                strict,
                config: cli.config,
            };
            seqc::cli::compile::run(options, cli.verbose).await
        }
        Commands::Check {
            sequence,
            dataset,
            jobtypes,
        } => seqc::cli::check::run(sequence, dataset, jobtypes, cli.config, cli.verbose).await,
        Commands::Graph {
            sequence,
            dataset,
            jobtypes,
            format,
        } => {
            seqc::cli::graph::run(sequence, dataset, jobtypes, format, cli.config, cli.verbose)
                .await
        }
        Commands::Tree { dataset, resolved } => {
            seqc::cli::tree::run(dataset, resolved, cli.config).await
        }
        Commands::Fmt { sequence, jobtypes } => {
            seqc::cli::fmt::run(sequence, jobtypes, cli.config).await
        }
    }
}
