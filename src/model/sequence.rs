// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Sequences and the pipeline text format
//!
//! A sequence is one root block instance plus global variables. It is
//! written as line-oriented text:
//!
//! ```text
//! set NAME=smoothing study
//! set PRIORITY=2
//!
//! defblock pipeline
//!   smooth nowait sigma=4
//!   stat waitfor smooth
//! end
//!
//! pipeline using *
//! block using s1
//!   stat nowait
//! end
//! ```
//!
//! An instance line without `waitfor` or `nowait` waits for the line
//! before it.

use std::path::Path;

use super::definition::{BlockDef, DefId};
use super::instance::{Exec, ExecId, ExecKind};
use super::library::Library;
use crate::errors::{Diagnostics, SeqError, SeqResult};
use crate::plan::sort::TopologicalSorter;
use crate::utils::pattern::matches;
use crate::utils::text::{first_word, logical_lines, split_assignment, tokens, unescape, unquote, Comments, Line};
use crate::utils::vars::VarMap;

/// Variable holding the sequence name
pub const NAME_VAR: &str = "NAME";

/// Variable holding the queue priority
pub const PRIORITY_VAR: &str = "PRIORITY";

/// Priority used when the sequence does not set one
pub const DEFAULT_PRIORITY: &str = "3";

/// A compiled-ready pipeline: variables, definitions and a root block
#[derive(Debug, Clone)]
pub struct Sequence {
    vars: VarMap,
    library: Library,
    root_def: DefId,
    root: ExecId,
    definitions: Vec<DefId>,
    includes: Vec<String>,
}

impl Sequence {
    /// An empty sequence over a library
    pub fn new(library: Library) -> SeqResult<Self> {
        Self::from_template(library, Vec::new())
    }

    /// A sequence whose root block copies the given template instances
    pub fn from_template(mut library: Library, template: Vec<ExecId>) -> SeqResult<Self> {
        let root_def = library.add_block_def(BlockDef {
            template,
            ..BlockDef::default()
        });
        let root = library.declare(root_def)?;

        let mut vars = VarMap::new();
        vars.insert(NAME_VAR.to_string(), String::new());
        vars.insert(PRIORITY_VAR.to_string(), DEFAULT_PRIORITY.to_string());

        Ok(Self {
            vars,
            library,
            root_def,
            root,
            definitions: Vec::new(),
            includes: Vec::new(),
        })
    }

    /// Parse pipeline text against the job types in `library`
    ///
    /// Problems with individual lines are reported in the returned
    /// diagnostics and the line is skipped.
    pub fn parse(input: &str, library: Library) -> SeqResult<(Self, Diagnostics)> {
        let mut reader = Reader {
            lines: logical_lines(input, Comments::Inline),
            pos: 0,
            library,
            diags: Diagnostics::new(),
            vars: VarMap::new(),
            definitions: Vec::new(),
            includes: Vec::new(),
            anonymous: 0,
        };
        let template = reader.read_body(None);

        let mut sequence = Self::from_template(reader.library, template)?;
        sequence.vars.extend(reader.vars);
        sequence.definitions = reader.definitions;
        sequence.includes = reader.includes;

        tracing::debug!(
            "read sequence '{}' with {} definitions",
            sequence.name(),
            sequence.definitions.len()
        );
        Ok((sequence, reader.diags))
    }

    /// Load a pipeline file
    pub fn from_file(path: &Path, library: Library) -> SeqResult<(Self, Diagnostics)> {
        let content = SeqError::read_file(path)?;
        Self::parse(&content, library)
    }

    pub fn name(&self) -> &str {
        self.vars.get(NAME_VAR).map(String::as_str).unwrap_or_default()
    }

    pub fn priority(&self) -> &str {
        self.vars
            .get(PRIORITY_VAR)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn root(&self) -> ExecId {
        self.root
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    /// Block definitions declared by the pipeline text, in order
    pub fn definitions(&self) -> &[DefId] {
        &self.definitions
    }

    /// `include` lines seen while reading
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Every top-level instance comes after the instances it waits for
    pub fn execs_are_sorted(&self) -> bool {
        TopologicalSorter::is_sorted(&self.top_level())
    }

    /// Reorder the top-level instances by dependency depth
    pub fn sort_execs(&mut self) {
        let sorted: Vec<ExecId> = TopologicalSorter::sort(self.top_level())
            .into_iter()
            .map(|exec| exec.id)
            .collect();
        if let ExecKind::Block { execs } = &mut self.library.exec_mut(self.root).kind {
            *execs = sorted;
        }
    }

    fn top_level(&self) -> Vec<Exec> {
        self.library
            .exec(self.root)
            .execs()
            .iter()
            .map(|id| self.library.exec(*id).clone())
            .collect()
    }

    /// Render the sequence back into pipeline text
    pub fn write(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.vars {
            out.push_str(&format!("set {}={}\n", name, value));
        }
        for include in &self.includes {
            out.push_str(&format!("include {}\n", include));
        }

        for def in &self.definitions {
            let Some(block) = self.library.def(*def).as_block() else {
                continue;
            };
            if block.anonymous || *def == self.root_def {
                continue;
            }
            out.push_str(&format!("\ndefblock {}\n", block.name));
            self.write_execs(&block.template, 1, &mut out);
            out.push_str("end\n");
        }

        out.push('\n');
        self.write_execs(self.library.exec(self.root).execs(), 0, &mut out);
        out
    }

    fn write_execs(&self, execs: &[ExecId], depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        for exec in execs {
            out.push_str(&format!("{}{}\n", indent, self.library.instance_line(*exec)));

            let def = self.library.def(self.library.exec(*exec).def);
            if let Some(block) = def.as_block().filter(|b| b.anonymous) {
                self.write_execs(&block.template, depth + 1, out);
                out.push_str(&format!("{}end\n", indent));
            }
        }
    }
}

struct Reader {
    lines: Vec<Line>,
    pos: usize,
    library: Library,
    diags: Diagnostics,
    vars: VarMap,
    definitions: Vec<DefId>,
    includes: Vec<String>,
    anonymous: u32,
}

impl Reader {
    /// Read instance lines until `end` (inside a block) or end of input
    fn read_body(&mut self, owner: Option<DefId>) -> Vec<ExecId> {
        let mut body = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].clone();
            self.pos += 1;
            if line.unterminated {
                self.diags.line_error(line.number, "unterminated quote");
            }

            let (word, rest) = first_word(&line.text);
            match word {
                "end" => {
                    if owner.is_some() {
                        return body;
                    }
                    self.diags.line_error(line.number, "'end' without an open block");
                }
                "set" | "include" | "defblock" if owner.is_some() => {
                    self.diags
                        .line_error(line.number, &format!("'{}' is only allowed at top level", word));
                }
                "set" => match rest.split_once('=') {
                    Some((name, value)) if !name.trim().is_empty() => {
                        self.vars.insert(name.trim().to_string(), value.to_string());
                    }
                    _ => self.diags.line_error(line.number, "expected 'set NAME=VALUE'"),
                },
                "include" => {
                    self.includes.push(rest.to_string());
                    self.diags
                        .line_warning(line.number, &format!("include of '{}' is not supported", rest));
                }
                "defblock" => self.read_defblock(&line, rest),
                "block" => {
                    if let Some(exec) = self.read_anonymous_block(&line, rest, &body) {
                        body.push(exec);
                    }
                }
                _ => match self.library.lookup(word) {
                    None => self
                        .diags
                        .line_error(line.number, &format!("unknown definition '{}'", word)),
                    Some(def) if Some(def) == owner => self.diags.line_error(
                        line.number,
                        &format!("block '{}' cannot contain itself", word),
                    ),
                    Some(def) => {
                        if let Some(exec) = self.read_instance(def, &tokens(rest), line.number, &body) {
                            body.push(exec);
                        }
                    }
                },
            }
        }

        if let Some(owner) = owner {
            let name = self.library.def(owner).name().to_string();
            self.diags
                .add_error(&format!("block '{}' is missing its 'end'", name));
        }
        body
    }

    fn read_defblock(&mut self, line: &Line, rest: &str) {
        let (name, extra) = first_word(rest);
        if name.is_empty() {
            self.diags.line_error(line.number, "defblock needs a name");
            return;
        }
        if !extra.is_empty() {
            self.diags
                .line_warning(line.number, &format!("ignoring '{}' after defblock name", extra));
        }

        let existing = self.library.lookup(name);
        if existing.is_some() {
            self.diags
                .line_warning(line.number, &format!("definition '{}' redefined", name));
        }
        let def = self.library.add_block_def(BlockDef::new(name));
        if !self.definitions.contains(&def) {
            self.definitions.push(def);
        }

        let template = self.read_body(Some(def));
        if let Ok(block) = self.library.block_def_mut(def) {
            block.template = template;
        }
    }

    fn read_anonymous_block(&mut self, line: &Line, rest: &str, siblings: &[ExecId]) -> Option<ExecId> {
        self.anonymous += 1;
        let name = format!("anonymous_block{:04}", self.anonymous);
        let def = self.library.add_block_def(BlockDef {
            anonymous: true,
            ..BlockDef::new(&name)
        });
        self.definitions.push(def);

        let template = self.read_body(Some(def));
        if let Ok(block) = self.library.block_def_mut(def) {
            block.template = template;
        }
        self.read_instance(def, &tokens(rest), line.number, siblings)
    }

    fn read_instance(
        &mut self,
        def: DefId,
        toks: &[String],
        number: usize,
        siblings: &[ExecId],
    ) -> Option<ExecId> {
        let exec = match self.library.declare(def) {
            Ok(exec) => exec,
            Err(e) => {
                self.diags.line_error(number, &e.to_string());
                return None;
            }
        };

        let mut nowait = false;
        let mut depends: Vec<ExecId> = Vec::new();
        let mut iter = toks.iter();
        while let Some(token) = iter.next() {
            match token.as_str() {
                "name" | "using" | "waitfor" => {
                    let Some(value) = iter.next() else {
                        self.diags
                            .line_error(number, &format!("'{}' needs a value", token));
                        break;
                    };
                    let value = unescape(unquote(value));
                    let value: &str = &value;
                    match token.as_str() {
                        "name" => self.library.exec_mut(exec).name = value.to_string(),
                        "using" => self.library.exec_mut(exec).path = value.to_string(),
                        _ => {
                            let matched: Vec<ExecId> = siblings
                                .iter()
                                .copied()
                                .filter(|s| matches(&self.library.exec(*s).name, value))
                                .collect();
                            if matched.is_empty() {
                                self.diags.line_warning(
                                    number,
                                    &format!("waitfor '{}' matches no earlier instance", value),
                                );
                            }
                            for m in matched {
                                if !depends.contains(&m) {
                                    depends.push(m);
                                }
                            }
                        }
                    }
                }
                "nowait" => nowait = true,
                _ => match split_assignment(token) {
                    Some((key, value)) if !key.is_empty() => {
                        self.library
                            .exec_mut(exec)
                            .data
                            .insert(key.to_string(), unescape(value).into_owned());
                    }
                    _ => self
                        .diags
                        .line_error(number, &format!("unrecognized token '{}'", token)),
                },
            }
        }

        if nowait && !depends.is_empty() {
            self.diags
                .line_warning(number, "'nowait' ignored because 'waitfor' is also given");
        }
        if depends.is_empty() && !nowait {
            if let Some(previous) = siblings.last() {
                depends.push(*previous);
            }
        }
        self.library.exec_mut(exec).depends = depends;

        Some(exec)
    }
}
