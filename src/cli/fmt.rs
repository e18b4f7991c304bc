// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Fmt command - print a sequence in normalized form

use miette::Result;
use std::path::PathBuf;

use super::{load_config, load_library, load_sequence};
use crate::errors::Diagnostics;
use crate::utils::colors::print_diagnostics;

/// Run the fmt command
pub async fn run(sequence_path: PathBuf, jobtypes: Vec<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let mut diags = Diagnostics::new();
    let library = load_library(&config, &jobtypes, &mut diags)?;
    let sequence = load_sequence(&sequence_path, library, &mut diags)?;

    print!("{}", sequence.write());
    print_diagnostics(&diags);

    if diags.is_clean() {
        Ok(())
    } else {
        Err(miette::miette!("Sequence has errors; the output may be incomplete"))
    }
}
