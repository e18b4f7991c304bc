// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Job type files (`*.vjt`)
//!
//! ```text
//! name=smooth
//! description=Gaussian smoothing
//! argument
//!   name=sigma
//!   default=2
//! end
//! file
//!   fileid image
//!   informats img nii
//!   output $(DIR)/s$$
//!   nii:output $(DIR)/setextension($$,)_s.nii
//!   set HDR=setextension($$,hdr)
//! end
//! command smooth -s $(sigma) $(image_in)
//! | echo done
//! ```

use std::path::Path;

use super::definition::{Argument, Command, FileSpec, JobType};
use super::library::Library;
use crate::errors::{Diagnostics, SeqError, SeqResult};
use crate::utils::text::{first_word, logical_lines, split_assignment, Comments};

/// File extension of job type files
pub const JOBTYPE_EXTENSION: &str = "vjt";

enum Section {
    Top,
    Argument(Argument),
    File(FileSpec),
}

/// Split `key=value` or `key value`
fn key_value(text: &str) -> (&str, &str) {
    let (word, rest) = first_word(text);
    if word.contains('=') {
        split_assignment(text).unwrap_or((word, rest))
    } else {
        (word, rest)
    }
}

impl JobType {
    /// Parse job type text
    pub fn parse(input: &str) -> (Self, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut job = JobType::new("");
        let mut section = Section::Top;

        for line in logical_lines(input, Comments::Leading) {
            let (key, value) = key_value(&line.text);

            section = match section {
                Section::Argument(mut arg) => {
                    if key == "end" {
                        if arg.name.is_empty() {
                            diags.line_error(line.number, "argument has no name");
                        } else {
                            job.add_argument(arg);
                        }
                        Section::Top
                    } else {
                        match key {
                            "name" => arg.name = value.to_string(),
                            "defaultval" | "default" => {
                                arg.info.insert("default".to_string(), value.to_string());
                            }
                            _ => {
                                arg.info.insert(key.to_string(), value.to_string());
                            }
                        }
                        Section::Argument(arg)
                    }
                }
                Section::File(mut file) => {
                    if key == "end" {
                        if file.id.is_empty() {
                            diags.line_error(line.number, "file has no fileid");
                        } else {
                            job.files.push(file);
                        }
                        Section::Top
                    } else {
                        read_file_line(&mut file, key, value, line.number, &mut diags);
                        Section::File(file)
                    }
                }
                Section::Top => {
                    if let Some(script) = line.text.strip_prefix('|') {
                        match job.commands.last_mut() {
                            Some(command) => command
                                .script
                                .push(script.strip_prefix(' ').unwrap_or(script).to_string()),
                            None => diags.line_error(line.number, "script line before any command"),
                        }
                        Section::Top
                    } else {
                        match key {
                            "argument" => Section::Argument(Argument::new("")),
                            "file" => Section::File(FileSpec::default()),
                            "command" => {
                                job.commands.push(Command {
                                    command: value.to_string(),
                                    script: Vec::new(),
                                });
                                Section::Top
                            }
                            "name" | "shortname" => {
                                job.name = value.to_string();
                                Section::Top
                            }
                            "description" => {
                                job.description = value.to_string();
                                Section::Top
                            }
                            _ => {
                                job.info.insert(key.to_string(), value.to_string());
                                Section::Top
                            }
                        }
                    }
                }
            };
        }

        match section {
            Section::Top => {}
            Section::Argument(_) => diags.add_error("argument block not closed with 'end'"),
            Section::File(_) => diags.add_error("file block not closed with 'end'"),
        }
        if job.name.is_empty() {
            diags.add_error("job type has no name");
        }

        (job, diags)
    }

    /// Load a job type file
    pub fn from_file(path: &Path) -> SeqResult<(Self, Diagnostics)> {
        let content = SeqError::read_file(path)?;
        Ok(Self::parse(&content))
    }
}

fn read_file_line(file: &mut FileSpec, key: &str, value: &str, line: usize, diags: &mut Diagnostics) {
    let (format, directive) = match key.split_once(':') {
        Some((format, directive)) => (Some(format), directive),
        None => (None, key),
    };

    match (format, directive) {
        (None, "fileid") => file.id = value.to_string(),
        (None, "description") => file.description = value.to_string(),
        (None, "input") => file.in_name = value.to_string(),
        (None, "informats") => file
            .in_formats
            .extend(value.split_whitespace().map(String::from)),
        (format, "output") => file.set_output(format.unwrap_or_default(), value),
        (format, "set") => match split_assignment(value) {
            Some((name, assigned)) if !name.is_empty() => file.add_var(format, name, assigned),
            _ => diags.line_error(line, &format!("expected NAME=VALUE after 'set', found '{}'", value)),
        },
        _ => diags.line_warning(line, &format!("unknown file directive '{}'", key)),
    }
}

/// Register every `*.vjt` file of a directory with the library
pub fn load_job_type_dir(library: &mut Library, dir: &Path) -> SeqResult<Diagnostics> {
    let mut diags = Diagnostics::new();
    let pattern = dir.join(format!("*.{}", JOBTYPE_EXTENSION));

    let mut paths = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        paths.push(entry.map_err(|e| SeqError::Io {
            message: e.to_string(),
        })?);
    }
    paths.sort();

    for path in paths {
        let (job, file_diags) = JobType::from_file(&path)?;
        let context = path.display().to_string();
        if job.name.is_empty() {
            diags.merge(&context, file_diags);
            continue;
        }
        tracing::debug!("loaded job type '{}' from {}", job.name, context);
        diags.merge(&context, file_diags);
        library.add_job_type(job);
    }

    Ok(diags)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMOOTH: &str = "\
name=smooth
description=Gaussian smoothing
category=filters
argument
  name=sigma
  defaultval=2
end
file
  fileid image
  input $(DIR)/raw.img
  informats img nii
  output $(DIR)/s$$
  nii:output $(DIR)/s.nii
  set HDR=setextension($$,hdr)
  nii:set TYPE=nifti
end
command smooth -s $(sigma)
| echo one
|echo two
";

    #[test]
    fn test_parse_job_type() {
        let (job, diags) = JobType::parse(SMOOTH);
        assert!(diags.is_empty(), "{:?}", diags);

        assert_eq!(job.name, "smooth");
        assert_eq!(job.description, "Gaussian smoothing");
        assert_eq!(job.info["category"], "filters");
        assert_eq!(job.arguments.len(), 2);
        assert_eq!(job.argument("sigma").unwrap().default_value(), Some("2"));

        let file = &job.files[0];
        assert_eq!(file.id, "image");
        assert_eq!(file.in_name, "$(DIR)/raw.img");
        assert_eq!(file.in_formats, vec!["img", "nii"]);
        assert_eq!(file.output_for(""), Some("$(DIR)/s$$"));
        assert_eq!(file.output_for("nii"), Some("$(DIR)/s.nii"));
        assert_eq!(file.global_vars, vec![("HDR".to_string(), "setextension($$,hdr)".to_string())]);
        assert_eq!(file.format_vars["nii"], vec![("TYPE".to_string(), "nifti".to_string())]);

        assert_eq!(job.commands[0].command, "smooth -s $(sigma)");
        assert_eq!(job.commands[0].script, vec!["echo one", "echo two"]);
    }

    #[test]
    fn test_parse_reports_problems() {
        let (job, diags) = JobType::parse("argument\ndefault=1\nend\nfile\nbogus x\n");
        assert!(job.name.is_empty());
        assert!(diags.errors.iter().any(|e| e.contains("argument has no name")));
        assert!(diags.errors.iter().any(|e| e.contains("not closed")));
        assert!(diags.errors.iter().any(|e| e.contains("no name")));
        assert!(diags.warnings.iter().any(|w| w.contains("unknown file directive")));
    }

    #[test]
    fn test_load_job_type_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("smooth.vjt"), SMOOTH).unwrap();
        std::fs::write(temp.path().join("stat.vjt"), "shortname stat\n").unwrap();
        std::fs::write(temp.path().join("broken.vjt"), "description=nothing\n").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "name=ignored\n").unwrap();

        let mut library = Library::new();
        let diags = load_job_type_dir(&mut library, temp.path()).unwrap();

        assert!(library.lookup("smooth").is_some());
        assert!(library.lookup("stat").is_some());
        assert!(library.lookup("ignored").is_none());
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].contains("broken.vjt"));
    }
}
