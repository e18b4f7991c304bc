// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Tree command - show a dataset

use miette::Result;
use std::path::PathBuf;

use super::{load_config, load_dataset};
use crate::dataset::DataSet;
use crate::errors::Diagnostics;
use crate::utils::colors::{print_diagnostics, print_header, print_section, print_warning};

/// Run the tree command
pub async fn run(dataset_path: PathBuf, resolved: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let mut diags = Diagnostics::new();
    let dataset = load_dataset(&dataset_path, &mut diags)?;

    print_header(&dataset_path.display().to_string());
    print!("{}", dataset.render_tree());

    if resolved {
        for node in dataset.descendants(DataSet::ROOT) {
            print_section(&dataset.long_name(node));
            let resolution = dataset.resolve(node, config.max_substitution_passes);
            for (name, value) in &resolution.vars {
                println!("  {}={}", name, value);
            }
            for name in &resolution.unresolved {
                print_warning(&format!("'{}' refers to itself through other variables", name));
            }
        }
    }

    print_diagnostics(&diags);

    Ok(())
}
