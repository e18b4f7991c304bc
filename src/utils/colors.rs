// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use colored::Colorize;

use crate::errors::Diagnostics;

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.chars().count().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print an info item
pub fn print_info(msg: &str) {
    println!("  {} {}", "→".blue(), msg);
}

/// Print errors and warnings to stderr
pub fn print_diagnostics(diags: &Diagnostics) {
    if !diags.errors.is_empty() {
        eprintln!("{}:", "Errors".red().bold());
        for error in &diags.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
    }
    if !diags.warnings.is_empty() {
        eprintln!("{}:", "Warnings".yellow().bold());
        for warning in &diags.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
    }
}
