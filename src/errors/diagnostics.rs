// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Non-fatal findings collected while reading and compiling

use serde::Serialize;

/// Errors and warnings gathered during one read or compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        tracing::debug!(kind = "error", "{}", message);
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        tracing::debug!(kind = "warning", "{}", message);
        self.warnings.push(message.to_string());
    }

    /// Record an error tied to an input line
    pub fn line_error(&mut self, line: usize, message: &str) {
        self.add_error(&format!("line {}: {}", line, message));
    }

    /// Record a warning tied to an input line
    pub fn line_warning(&mut self, line: usize, message: &str) {
        self.add_warning(&format!("line {}: {}", line, message));
    }

    /// No errors were recorded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Append another set of findings, prefixing each with `context`
    pub fn merge(&mut self, context: &str, other: Diagnostics) {
        let prefix = |msg: String| {
            if context.is_empty() {
                msg
            } else {
                format!("{}: {}", context, msg)
            }
        };
        self.errors.extend(other.errors.into_iter().map(prefix));
        self.warnings.extend(other.warnings.into_iter().map(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_until_error() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_clean());
        diags.add_warning("just a warning");
        assert!(diags.is_clean());
        assert!(diags.has_warnings());
        diags.line_error(7, "bad token");
        assert!(!diags.is_clean());
        assert_eq!(diags.errors[0], "line 7: bad token");
    }

    #[test]
    fn test_merge_prefixes_context() {
        let mut inner = Diagnostics::new();
        inner.add_error("broken");
        inner.add_warning("odd");

        let mut outer = Diagnostics::new();
        outer.merge("smooth.vjt", inner);
        assert_eq!(outer.errors, vec!["smooth.vjt: broken"]);
        assert_eq!(outer.warnings, vec!["smooth.vjt: odd"]);
    }
}
