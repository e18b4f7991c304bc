// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Dataset text format
//!
//! ```text
//! # root members
//! DIR=/data
//! s1:run1 DIR=/data/s1/run1 TR=2
//! :note="applies to s1:run1
//! across two lines"
//! ```
//!
//! An assignment applies to the root unless the line starts with `:`, in
//! which case it applies to the node addressed most recently. A bare path
//! token addresses a node from the root, creating it if needed.

use std::path::Path;

use super::{DataSet, NodeId};
use crate::errors::{Diagnostics, SeqError, SeqResult};
use crate::utils::text::{logical_lines, split_assignment, tokens, unescape, Comments};

impl DataSet {
    /// Parse dataset text into a new tree
    pub fn parse(input: &str) -> (Self, Diagnostics) {
        let mut dataset = Self::new();
        let diagnostics = dataset.read(input);
        (dataset, diagnostics)
    }

    /// Load a dataset file
    pub fn from_file(path: &Path) -> SeqResult<(Self, Diagnostics)> {
        let content = SeqError::read_file(path)?;
        Ok(Self::parse(&content))
    }

    /// Merge dataset text into this tree
    pub fn read(&mut self, input: &str) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let mut current: NodeId = Self::ROOT;

        for line in logical_lines(input, Comments::Leading) {
            if line.unterminated {
                diags.line_error(line.number, "unterminated quote");
            }

            let text = match line.text.strip_prefix(':') {
                Some(rest) => rest,
                None => {
                    current = Self::ROOT;
                    line.text.as_str()
                }
            };

            let mut expect_assignment = false;
            for token in tokens(text) {
                match split_assignment(&token) {
                    Some(("", _)) => {
                        diags.line_error(line.number, &format!("assignment without a name: '{}'", token));
                    }
                    Some((key, value)) => {
                        self.insert_member(current, key, &unescape(value), true);
                        expect_assignment = false;
                    }
                    None if expect_assignment => {
                        diags.line_error(line.number, &format!("missing '=' in '{}'", token));
                    }
                    None => {
                        current = self.insert_path(Self::ROOT, &token);
                        expect_assignment = true;
                    }
                }
            }
        }

        diags
    }
}
