// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Variable substitution
//!
//! Values refer to other variables as `$(name)`. A reference to an unknown
//! name is left in place so a later pass, with more variables in scope, can
//! still resolve it.
//!
//! File descriptors add two more tokens, expanded before ordinary
//! substitution:
//!
//! - `$$` is replaced by the job's input filename
//! - `setextension(name, ext)` is replaced by `name` with its extension
//!   swapped for `ext` (or stripped when `ext` is empty)

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Ordered variable bindings
pub type VarMap = BTreeMap<String, String>;

/// Upper bound on fixed-point passes when no configuration says otherwise
pub const DEFAULT_MAX_PASSES: usize = 64;

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(([^()$\s]+)\)").expect("variable reference pattern is valid")
});

const SET_EXTENSION: &str = "setextension(";

/// Replace every `$(name)` whose name is bound in `vars`
///
/// Returns the number of replacements made.
pub fn substitute(value: &mut String, vars: &VarMap) -> usize {
    let mut count = 0;
    let replaced = VAR_REF.replace_all(value.as_str(), |caps: &Captures| {
        match vars.get(&caps[1]) {
            Some(bound) => {
                count += 1;
                bound.clone()
            }
            None => caps[0].to_string(),
        }
    });
    let new_value = replaced.into_owned();
    if count > 0 {
        *value = new_value;
    }
    count
}

/// Substitute into a copy of `value`
pub fn substituted(value: &str, vars: &VarMap) -> String {
    let mut out = value.to_string();
    substitute(&mut out, vars);
    out
}

/// Names referenced by `$(name)` in `value`
pub fn references(value: &str) -> Vec<&str> {
    VAR_REF
        .captures_iter(value)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Substitute the map into itself until nothing changes
///
/// Stops after `max_passes` passes. Returns the names whose values still
/// refer to bound variables at that point, which only happens when the
/// references form a cycle. An empty result means the map reached a fixed
/// point.
pub fn resolve_fixed_point(vars: &mut VarMap, max_passes: usize) -> Vec<String> {
    for _ in 0..max_passes {
        let snapshot = vars.clone();
        let mut replaced = 0;
        for value in vars.values_mut() {
            replaced += substitute(value, &snapshot);
        }
        if replaced == 0 {
            return Vec::new();
        }
    }

    vars.iter()
        .filter(|(_, value)| references(value).iter().any(|name| vars.contains_key(*name)))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Swap the extension of a filename
///
/// Only a dot in the last path component counts as an extension separator.
pub fn set_extension(name: &str, ext: &str) -> String {
    let dot = name.rfind('.');
    let slash = name.rfind('/');
    let dot = match (dot, slash) {
        (Some(d), Some(s)) if s > d => None,
        (d, _) => d,
    };

    let stem = match dot {
        Some(d) => &name[..d],
        None => name,
    };
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, ext)
    }
}

/// Expand `$$` and `setextension(...)` in a file variable
pub fn expand_file_tokens(value: &str, in_file: &str) -> String {
    let mut out = value.replace("$$", in_file);

    let mut search_from = 0;
    while let Some(offset) = out[search_from..].find(SET_EXTENSION) {
        let start = search_from + offset;
        let args_start = start + SET_EXTENSION.len();
        let Some(close) = out[args_start..].find(')') else {
            break;
        };
        let args_end = args_start + close;
        let args = &out[args_start..args_end];

        let replacement = match args.rfind(',') {
            Some(comma) => {
                let old_name = args[..comma].trim().trim_matches('"');
                let new_ext = args[comma + 1..].trim().trim_matches('"');
                set_extension(old_name, new_ext)
            }
            None => set_extension(args.trim().trim_matches('"'), ""),
        };

        out.replace_range(start..=args_end, &replacement);
        search_from = start + replacement.len();
    }

    out
}

/// Two-phase expansion used for file variables and output names
pub fn fill_file_vars(value: &str, in_file: &str, vars: &VarMap) -> String {
    let mut out = expand_file_tokens(value, in_file);
    substitute(&mut out, vars);
    out
}
