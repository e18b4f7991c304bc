// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Reusable definitions: job types and block templates
//!
//! A definition is authored once and instantiated any number of times. Job
//! types describe a single executable with its arguments and files; block
//! definitions hold an ordered template of already declared instances.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::instance::ExecId;

/// Argument present on every job type, naming the working directory
pub const DIR_ARGUMENT: &str = "DIR";

/// Identifier of a definition inside a [`Library`](super::Library)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DefId(pub(crate) usize);

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def#{}", self.0)
    }
}

/// A named argument of a job type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: String,
    /// Free-form attributes; `default` supplies a fallback value
    pub info: BTreeMap<String, String>,
}

impl Argument {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            info: BTreeMap::new(),
        }
    }

    pub fn with_default(name: &str, default: &str) -> Self {
        let mut arg = Self::new(name);
        arg.info.insert("default".to_string(), default.to_string());
        arg
    }

    pub fn default_value(&self) -> Option<&str> {
        self.info.get("default").map(String::as_str)
    }
}

/// A file a job type reads and writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSpec {
    /// Identifies the same logical file across job types
    pub id: String,
    pub description: String,
    /// Input filename used when no earlier job produced this file
    pub in_name: String,
    /// Accepted input formats, most preferred first
    pub in_formats: Vec<String>,
    /// Output filename per format, in declaration order; `""` is the
    /// default format
    pub out_names: Vec<(String, String)>,
    /// Extra variables set whatever the format
    pub global_vars: Vec<(String, String)>,
    /// Extra variables per selected format
    pub format_vars: BTreeMap<String, Vec<(String, String)>>,
}

impl FileSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn input(mut self, name: &str) -> Self {
        self.in_name = name.to_string();
        self
    }

    pub fn accepts(mut self, format: &str) -> Self {
        self.in_formats.push(format.to_string());
        self
    }

    pub fn output(mut self, format: &str, name: &str) -> Self {
        self.set_output(format, name);
        self
    }

    pub fn var(mut self, format: Option<&str>, name: &str, value: &str) -> Self {
        self.add_var(format, name, value);
        self
    }

    /// Set the output name for a format, replacing an earlier one
    pub fn set_output(&mut self, format: &str, name: &str) {
        match self.out_names.iter().position(|(f, _)| f == format) {
            Some(pos) => self.out_names[pos].1 = name.to_string(),
            None => self.out_names.push((format.to_string(), name.to_string())),
        }
    }

    /// Add an extra variable, global when `format` is `None`
    pub fn add_var(&mut self, format: Option<&str>, name: &str, value: &str) {
        let entry = (name.to_string(), value.to_string());
        match format {
            Some(format) => self
                .format_vars
                .entry(format.to_string())
                .or_default()
                .push(entry),
            None => self.global_vars.push(entry),
        }
    }

    pub fn output_for(&self, format: &str) -> Option<&str> {
        self.out_names
            .iter()
            .find(|(f, _)| f == format)
            .map(|(_, name)| name.as_str())
    }

    /// Format the job expects its input in, before substitution
    pub fn required_format(&self) -> Option<&str> {
        self.in_formats.first().map(String::as_str)
    }
}

/// A command line plus an optional inline script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Command {
    pub command: String,
    pub script: Vec<String>,
}

/// Definition of a single executable job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobType {
    pub name: String,
    pub description: String,
    pub info: BTreeMap<String, String>,
    pub arguments: Vec<Argument>,
    pub files: Vec<FileSpec>,
    pub commands: Vec<Command>,
}

impl JobType {
    /// A job type with only the implicit working directory argument
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            info: BTreeMap::new(),
            arguments: vec![Argument::new(DIR_ARGUMENT)],
            files: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_argument(mut self, arg: Argument) -> Self {
        self.add_argument(arg);
        self
    }

    pub fn with_file(mut self, file: FileSpec) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.commands.push(Command {
            command: command.to_string(),
            script: Vec::new(),
        });
        self
    }

    /// Add an argument, replacing one with the same name
    pub fn add_argument(&mut self, arg: Argument) {
        match self.arguments.iter().position(|a| a.name == arg.name) {
            Some(pos) => self.arguments[pos] = arg,
            None => self.arguments.push(arg),
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// Definition of a composite block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDef {
    pub name: String,
    pub description: String,
    /// Template instances copied into every instance of the block
    pub template: Vec<ExecId>,
    /// Declared inline with `block ... end`
    pub anonymous: bool,
}

impl BlockDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// The two kinds of definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefKind {
    Job(JobType),
    Block(BlockDef),
}

/// A registered definition with its instance bookkeeping
#[derive(Debug, Clone)]
pub struct ExecDef {
    pub kind: DefKind,
    /// Number of instances declared so far
    pub usage: u32,
    pub(crate) instances: Vec<ExecId>,
    pub(crate) name_counters: HashMap<Option<ExecId>, u32>,
}

impl ExecDef {
    pub fn new(kind: DefKind) -> Self {
        Self {
            kind,
            usage: 0,
            instances: Vec::new(),
            name_counters: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            DefKind::Job(job) => &job.name,
            DefKind::Block(block) => &block.name,
        }
    }

    pub fn description(&self) -> &str {
        match &self.kind {
            DefKind::Job(job) => &job.description,
            DefKind::Block(block) => &block.description,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, DefKind::Block(_))
    }

    pub fn as_job_type(&self) -> Option<&JobType> {
        match &self.kind {
            DefKind::Job(job) => Some(job),
            DefKind::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockDef> {
        match &self.kind {
            DefKind::Block(block) => Some(block),
            DefKind::Job(_) => None,
        }
    }

    /// Instances declared from this definition
    pub fn instances(&self) -> &[ExecId] {
        &self.instances
    }

    /// Next per-parent name suffix: `""`, `"001"`, `"002"`, ...
    pub(crate) fn next_suffix(&mut self, parent: Option<ExecId>) -> String {
        let counter = self.name_counters.entry(parent).or_insert(0);
        let suffix = match *counter {
            0 => String::new(),
            n => format!("{:03}", n),
        };
        *counter += 1;
        suffix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_has_dir_argument() {
        let job = JobType::new("smooth").with_argument(Argument::with_default("sigma", "2"));
        assert_eq!(job.arguments[0].name, DIR_ARGUMENT);
        assert_eq!(job.argument("sigma").unwrap().default_value(), Some("2"));
        assert!(job.argument("DIR").unwrap().default_value().is_none());
    }

    #[test]
    fn test_add_argument_replaces() {
        let mut job = JobType::new("x");
        job.add_argument(Argument::with_default("DIR", "/tmp"));
        assert_eq!(job.arguments.len(), 1);
        assert_eq!(job.arguments[0].default_value(), Some("/tmp"));
    }

    #[test]
    fn test_file_spec_outputs_keep_order() {
        let file = FileSpec::new("F")
            .output("nii", "a.nii")
            .output("img", "a.img")
            .output("nii", "b.nii");
        assert_eq!(file.out_names[0], ("nii".to_string(), "b.nii".to_string()));
        assert_eq!(file.output_for("img"), Some("a.img"));
        assert_eq!(file.output_for(""), None);
    }

    #[test]
    fn test_name_suffixes_per_parent() {
        let mut def = ExecDef::new(DefKind::Job(JobType::new("j")));
        assert_eq!(def.next_suffix(None), "");
        assert_eq!(def.next_suffix(None), "001");
        assert_eq!(def.next_suffix(Some(ExecId(4))), "");
        assert_eq!(def.next_suffix(None), "002");
    }
}
