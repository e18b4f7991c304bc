// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! File and format resolution
//!
//! Each file a job type declares is matched against the history of the
//! same file id. When the latest upstream producer wrote it in a format the
//! job does not accept, a conversion job is inserted in between.
//!
//! For a file with id `image` the job sees `$(image_in)`, `$(image_informat)`,
//! `$(image_out)` and `$(image_outformat)`, plus the file's extra variables.

use super::context::{CompileContext, FileSnapShot};
use crate::dataset::NodeId;
use crate::model::{ExecId, FileSpec};
use crate::utils::vars::{fill_file_vars, substituted, VarMap};

/// Argument of the conversion job holding the source file
pub const CONVERSION_INFILE: &str = "infile";

/// Argument of the conversion job holding the converted file
pub const CONVERSION_OUTFILE: &str = "outfile";

/// Chosen output of a file
struct Output {
    name: String,
    format: String,
    /// Format key whose extra variables apply
    key: String,
}

fn select_output(file: &FileSpec, in_name: &str, in_format: &str) -> Option<Output> {
    if let Some(name) = file.output_for(in_format) {
        return Some(Output {
            name: name.to_string(),
            format: in_format.to_string(),
            key: in_format.to_string(),
        });
    }
    if let Some(name) = file.output_for("") {
        return Some(Output {
            name: name.to_string(),
            format: in_format.to_string(),
            key: String::new(),
        });
    }
    if let Some((format, name)) = file.out_names.first() {
        return Some(Output {
            name: name.clone(),
            format: format.clone(),
            key: format.clone(),
        });
    }
    tracing::trace!("file '{}' passes '{}' through", file.id, in_name);
    None
}

impl CompileContext<'_> {
    /// Resolve every file of `job` at `node` into `vars`
    ///
    /// Returns the conversion jobs the job has to wait for.
    pub(crate) fn resolve_files(
        &mut self,
        job: ExecId,
        node: NodeId,
        jnum: u32,
        files: &[FileSpec],
        vars: &mut VarMap,
    ) -> Vec<ExecId> {
        let mut conversions = Vec::new();

        for file in files {
            let required = file
                .required_format()
                .map(|format| substituted(format, vars))
                .unwrap_or_default();

            let (in_name, in_format) = match self.find_producer(job, node, &file.id) {
                Some(prev) if !required.is_empty() && prev.out_format != required => {
                    let converted = format!("{}.{}.{}", prev.out_name, jnum, required);
                    match self.conversion_job(job, node, &file.id, &prev, &converted, &required) {
                        Some(conv) => {
                            conversions.push(conv);
                            (converted, required.clone())
                        }
                        None => (prev.out_name, prev.out_format),
                    }
                }
                Some(prev) => (prev.out_name, prev.out_format),
                None => (substituted(&file.in_name, vars), required.clone()),
            };

            let (out_name, out_format, key) = match select_output(file, &in_name, &in_format) {
                Some(output) => (
                    fill_file_vars(&output.name, &in_name, vars),
                    fill_file_vars(&output.format, &in_name, vars),
                    Some(output.key),
                ),
                None => (in_name.clone(), in_format.clone(), None),
            };

            vars.insert(format!("{}_in", file.id), in_name.clone());
            vars.insert(format!("{}_informat", file.id), in_format.clone());
            vars.insert(format!("{}_out", file.id), out_name.clone());
            vars.insert(format!("{}_outformat", file.id), out_format.clone());

            let format_vars = key
                .and_then(|key| file.format_vars.get(&key))
                .into_iter()
                .flatten();
            for (name, value) in file.global_vars.iter().chain(format_vars) {
                let value = fill_file_vars(value, &in_name, vars);
                vars.insert(name.clone(), value);
            }

            if out_format.is_empty() {
                let message = format!(
                    "file '{}' of job '{}' has no output format",
                    file.id,
                    self.library.exec(job).name
                );
                self.diags.add_warning(&message);
            }

            self.history.entry(file.id.clone()).or_default().push(FileSnapShot {
                producer: job,
                node,
                in_name,
                in_format,
                out_name,
                out_format,
            });
        }

        conversions
    }

    /// Latest snapshot of `file_id` written by a job `job` waits for
    ///
    /// Snapshots at the same node win over those at an ancestor or
    /// descendant node.
    fn find_producer(&self, job: ExecId, node: NodeId, file_id: &str) -> Option<FileSnapShot> {
        let history = self.history.get(file_id)?;
        let upstream: Vec<&FileSnapShot> = history
            .iter()
            .rev()
            .filter(|snap| snap.producer != job)
            .filter(|snap| self.library.depends_on_transitively(job, snap.producer))
            .collect();

        upstream
            .iter()
            .find(|snap| snap.node == node)
            .or_else(|| {
                upstream.iter().find(|snap| {
                    self.dataset.is_ancestor(snap.node, node) || self.dataset.is_ancestor(node, snap.node)
                })
            })
            .map(|snap| (*snap).clone())
    }

    /// Conversion job between `prev` and `job`, declared once per file
    fn conversion_job(
        &mut self,
        job: ExecId,
        node: NodeId,
        file_id: &str,
        prev: &FileSnapShot,
        outfile: &str,
        format: &str,
    ) -> Option<ExecId> {
        let key = (job, node, file_id.to_string());
        if let Some(conv) = self.conversions.get(&key) {
            return Some(*conv);
        }

        let type_name = &self.config.conversion_job_type;
        let def = self
            .library
            .lookup(type_name)
            .filter(|def| self.library.def(*def).as_job_type().is_some());
        let Some(def) = def else {
            let message = format!(
                "conversion job type '{}' is not available; file '{}' of job '{}' is used as {}",
                type_name,
                file_id,
                self.library.exec(job).name,
                prev.out_format
            );
            self.diags.add_error(&message);
            return None;
        };

        let (parent, path) = {
            let consumer = self.library.exec(job);
            (consumer.parent, consumer.path.clone())
        };
        let conv = match self.library.declare_with_parent(def, parent) {
            Ok(conv) => conv,
            Err(e) => {
                self.diags.add_error(&e.to_string());
                return None;
            }
        };

        let exec = self.library.exec_mut(conv);
        exec.path = path;
        exec.depends = vec![prev.producer];
        exec.data.insert(
            CONVERSION_INFILE.to_string(),
            format!("{}[{}]", prev.out_name, prev.out_format),
        );
        exec.data
            .insert(CONVERSION_OUTFILE.to_string(), format!("{}[{}]", outfile, format));

        tracing::debug!(
            "converting '{}' from {} to {} for {}",
            prev.out_name,
            prev.out_format,
            format,
            self.library.exec(job).name
        );

        self.conversions.insert(key, conv);
        Some(conv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_output_priority() {
        let file = FileSpec::new("img")
            .output("nii", "$$.nii")
            .output("", "$$.out")
            .output("hdr", "$$.hdr");

        let keyed = select_output(&file, "a", "nii").unwrap();
        assert_eq!((keyed.name.as_str(), keyed.format.as_str()), ("$$.nii", "nii"));

        let default = select_output(&file, "a", "img").unwrap();
        assert_eq!((default.name.as_str(), default.format.as_str()), ("$$.out", "img"));
        assert_eq!(default.key, "");

        let first = FileSpec::new("img").output("hdr", "x.hdr").output("nii", "x.nii");
        let picked = select_output(&first, "a", "img").unwrap();
        assert_eq!((picked.name.as_str(), picked.format.as_str()), ("x.hdr", "hdr"));

        assert!(select_output(&FileSpec::new("img"), "a", "img").is_none());
    }
}
