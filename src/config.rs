// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Compiler configuration
//!
//! Loaded from `.seqc.yaml` in the project directory. Every field has a
//! default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{SeqError, SeqResult};
use crate::utils::vars::DEFAULT_MAX_PASSES;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = ".seqc.yaml";

/// Settings that shape compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Job numbers wrap back to 1 after reaching this bound
    #[serde(default = "default_job_number_bound")]
    pub job_number_bound: u32,

    /// Maximum passes when resolving variables that refer to variables
    #[serde(default = "default_max_passes")]
    pub max_substitution_passes: usize,

    /// Job type used for inserted format conversions
    #[serde(default = "default_conversion_job_type")]
    pub conversion_job_type: String,

    /// Variable holding a job's working directory
    #[serde(default = "default_working_dir_variable")]
    pub working_dir_variable: String,

    /// Log directory, relative to the working directory
    #[serde(default = "default_log_subdir")]
    pub log_subdir: String,

    /// Directories searched for `*.vjt` job type files
    #[serde(default)]
    pub jobtype_dirs: Vec<PathBuf>,
}

fn default_job_number_bound() -> u32 {
    100_000
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

fn default_conversion_job_type() -> String {
    "vbconv".to_string()
}

fn default_working_dir_variable() -> String {
    "DIR".to_string()
}

fn default_log_subdir() -> String {
    "logs".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            job_number_bound: default_job_number_bound(),
            max_substitution_passes: default_max_passes(),
            conversion_job_type: default_conversion_job_type(),
            working_dir_variable: default_working_dir_variable(),
            log_subdir: default_log_subdir(),
            jobtype_dirs: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> SeqResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = SeqError::read_file(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;

        // Relative job type directories are relative to the config file
        if let Some(base) = path.parent() {
            for dir in &mut config.jobtype_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }

        Ok(config)
    }

    /// Load from project directory (looks for .seqc.yaml)
    pub fn load_from_project(project_root: &Path) -> SeqResult<Self> {
        Self::load(&project_root.join(CONFIG_FILE))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> SeqResult<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(|e| SeqError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Log directory for a working directory
    pub fn log_dir(&self, working_dir: &str) -> String {
        if self.log_subdir.is_empty() {
            working_dir.to_string()
        } else {
            format!("{}/{}", working_dir, self.log_subdir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default() {
        let temp = TempDir::new().unwrap();
        let config = CompilerConfig::load_from_project(temp.path()).unwrap();

        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.job_number_bound, 100_000);
        assert_eq!(config.conversion_job_type, "vbconv");
    }

    #[test]
    fn test_load_partial_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            r#"
job_number_bound: 500
log_subdir: joblogs
jobtype_dirs:
  - jobtypes
"#,
        )
        .unwrap();

        let config = CompilerConfig::load_from_project(temp.path()).unwrap();

        assert_eq!(config.job_number_bound, 500);
        assert_eq!(config.log_subdir, "joblogs");
        assert_eq!(config.working_dir_variable, "DIR");
        assert_eq!(config.jobtype_dirs, vec![temp.path().join("jobtypes")]);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);

        let config = CompilerConfig {
            max_substitution_passes: 10,
            ..CompilerConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = CompilerConfig::load(&path).unwrap();
        assert_eq!(loaded.max_substitution_passes, 10);
    }

    #[test]
    fn test_log_dir() {
        let config = CompilerConfig::default();
        assert_eq!(config.log_dir("/data/s1"), "/data/s1/logs");
    }
}
