// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Sequence compilation
//!
//! The root block is walked over the dataset root. A block child runs on
//! every node its path matches below the current node; a job child becomes
//! one job spec per matched node.

use std::collections::BTreeMap;

use super::context::{CompileContext, JobNumbers};
use super::jobspec::{CompiledSequence, JobSpec};
use crate::config::CompilerConfig;
use crate::dataset::{DataSet, NodeId};
use crate::errors::{Diagnostics, SeqError, SeqResult};
use crate::model::sequence::{NAME_VAR, PRIORITY_VAR};
use crate::model::{ExecId, JobType, Sequence};
use crate::plan::resolver::DependencyResolver;
use crate::utils::vars::{substituted, VarMap};

/// An instance at a dataset node, used to cut a compilation short
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub exec: ExecId,
    pub node: NodeId,
}

impl Checkpoint {
    pub fn new(exec: ExecId, node: NodeId) -> Self {
        Self { exec, node }
    }

    /// Parse `INSTANCE@PATH`, where PATH is a literal dataset path (empty
    /// for the root) and INSTANCE may be qualified as `block/instance`
    pub fn parse(text: &str, sequence: &Sequence, dataset: &DataSet) -> SeqResult<Self> {
        let invalid = || SeqError::InvalidCheckpoint {
            spec: text.to_string(),
        };
        let (instance, path) = text.split_once('@').ok_or_else(invalid)?;
        if instance.is_empty() {
            return Err(invalid());
        }

        let exec = sequence.library().resolve_instance(sequence.root(), instance)?;
        let node = dataset
            .get_child(DataSet::ROOT, path)
            .ok_or_else(|| SeqError::UnknownDataSetNode {
                path: path.to_string(),
            })?;

        Ok(Self { exec, node })
    }
}

/// Output of one compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub sequence: CompiledSequence,
    pub diagnostics: Diagnostics,
}

/// Turns a sequence and a dataset into job specs
#[derive(Debug, Clone, Default)]
pub struct JobSpecCompiler {
    config: CompilerConfig,
}

impl JobSpecCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile every job of the sequence
    ///
    /// Never fails; problems are reported in the diagnostics and the
    /// affected jobs are degraded or skipped.
    pub fn compile(&self, sequence: &Sequence, dataset: &DataSet) -> Compilation {
        self.run(sequence, dataset).0
    }

    /// Compile, then keep only the jobs after `begin` and before `end`
    pub fn compile_between(
        &self,
        sequence: &Sequence,
        dataset: &DataSet,
        begin: Option<&Checkpoint>,
        end: Option<&Checkpoint>,
    ) -> Compilation {
        let (mut compilation, numbers) = self.run(sequence, dataset);
        if begin.is_none() && end.is_none() {
            return compilation;
        }

        let jobs_at = |checkpoint: &Checkpoint| -> Vec<u32> {
            sequence
                .library()
                .jobs_within(checkpoint.exec)
                .into_iter()
                .filter_map(|job| numbers.get(job, checkpoint.node))
                .collect()
        };
        let begin_jobs = begin.map(|c| jobs_at(c));
        let end_jobs = end.map(|c| jobs_at(c));

        let specs = std::mem::take(&mut compilation.sequence.specs);
        compilation.sequence.specs =
            DependencyResolver::prune(specs, begin_jobs.as_deref(), end_jobs.as_deref());
        compilation
    }

    fn run(&self, sequence: &Sequence, dataset: &DataSet) -> (Compilation, JobNumbers) {
        let mut ctx = CompileContext::new(&self.config, sequence.library().clone(), dataset.clone());

        for (name, value) in sequence.vars() {
            ctx.dataset.insert_member(DataSet::ROOT, name, value, true);
        }
        let root_vars = ctx
            .dataset
            .resolve(DataSet::ROOT, self.config.max_substitution_passes)
            .vars;
        let root_var = |name: &str| root_vars.get(name).cloned().unwrap_or_default();
        let mut output = CompiledSequence::new(
            &root_var(NAME_VAR),
            &root_var(PRIORITY_VAR),
            &root_var(&self.config.working_dir_variable),
        );

        tracing::debug!("compiling sequence '{}'", output.name);
        ctx.compile_block(sequence.root(), DataSet::ROOT);

        output.specs = ctx.specs;
        tracing::debug!(
            "compiled {} job specs ({} errors, {} warnings)",
            output.specs.len(),
            ctx.diags.errors.len(),
            ctx.diags.warnings.len()
        );

        let compilation = Compilation {
            sequence: output,
            diagnostics: ctx.diags,
        };
        (compilation, ctx.numbers)
    }
}

impl CompileContext<'_> {
    pub(crate) fn compile_block(&mut self, block: ExecId, node: NodeId) {
        let children = self.library.exec(block).execs().to_vec();

        for child in children {
            let exec = self.library.exec(child);
            let is_block = exec.is_block();
            let nodes = self.dataset.get_children(node, &exec.path);
            if nodes.is_empty() {
                tracing::debug!(
                    "'{}' matches no dataset node below {}",
                    exec.name,
                    self.dataset.long_name(node)
                );
            }

            for target in nodes {
                if is_block {
                    self.compile_block(child, target);
                } else {
                    self.compile_job(child, target);
                }
            }
        }
    }

    pub(crate) fn compile_job(&mut self, job: ExecId, node: NodeId) {
        if !self.start_job(job, node) {
            return;
        }
        let jnum = self.calc_job_num(job, node);
        let jobtype = match self.library.job_type_of(job) {
            Ok(jobtype) => jobtype.clone(),
            Err(e) => {
                self.diags.add_error(&e.to_string());
                return;
            }
        };

        let mut vars = self.job_vars(job, node);
        for arg in &jobtype.arguments {
            if vars.contains_key(&arg.name) {
                continue;
            }
            if let Some(default) = arg.default_value() {
                let value = substituted(default, &vars);
                vars.insert(arg.name.clone(), value);
            }
        }

        let conversions = self.resolve_files(job, node, jnum, &jobtype.files, &mut vars);
        for conv in &conversions {
            self.compile_job(*conv, node);
        }

        let arguments = self.job_arguments(job, node, &jobtype, &vars);
        let waitfor = self.compute_waitfor(job, node, &conversions);
        let dirname = vars
            .get(&self.config.working_dir_variable)
            .cloned()
            .unwrap_or_default();

        let spec = JobSpec {
            name: self.library.exec(job).name.clone(),
            jobtype: jobtype.name,
            jnum,
            arguments,
            logdir: self.config.log_dir(&dirname),
            dirname,
            waitfor,
        };
        tracing::trace!("job {} '{}' at {}", jnum, spec.name, self.dataset.long_name(node));

        if let Some(replaced) = self.specs.insert(jnum, spec) {
            let message = format!("job number {} reused; '{}' was overwritten", jnum, replaced.name);
            self.diags.add_warning(&message);
        }
    }

    /// Node variables with the instance's overrides on top
    fn job_vars(&mut self, job: ExecId, node: NodeId) -> VarMap {
        let resolution = self.dataset.resolve(node, self.config.max_substitution_passes);
        if !resolution.unresolved.is_empty() {
            let message = format!(
                "variables at {} refer to each other: {}",
                self.dataset.long_name(node),
                resolution.unresolved.join(", ")
            );
            self.diags.add_warning(&message);
        }

        let mut vars = resolution.vars;
        for (name, value) in &self.library.exec(job).data {
            let value = substituted(value, &vars);
            vars.insert(name.clone(), value);
        }
        vars
    }

    fn job_arguments(
        &mut self,
        job: ExecId,
        node: NodeId,
        jobtype: &JobType,
        vars: &VarMap,
    ) -> BTreeMap<String, String> {
        let mut arguments = BTreeMap::new();
        for arg in &jobtype.arguments {
            match vars.get(&arg.name) {
                Some(value) => {
                    arguments.insert(arg.name.clone(), substituted(value, vars));
                }
                None => {
                    let message = format!(
                        "argument '{}' of '{}' has no value at {}",
                        arg.name,
                        self.library.exec(job).name,
                        self.dataset.long_name(node)
                    );
                    self.diags.add_warning(&message);
                }
            }
        }
        arguments
    }
}
