// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SMOOTH: &str = "\
name=smooth
description=Gaussian smoothing
argument
  name=sigma
  defaultval=2
end
command smooth -s $(sigma) $(DIR)
";

const STAT: &str = "\
name=stat
command stat $(DIR)
";

const PIPELINE: &str = "\
set NAME=study $(SITE)
defblock pipeline
  smooth nowait
  stat waitfor smooth
end
pipeline using *
";

const SUBJECTS: &str = "\
SITE=north
s1 DIR=/data/s1
s2 DIR=/data/s2
";

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let jobtypes = temp.path().join("jobtypes");
    fs::create_dir(&jobtypes).unwrap();
    fs::write(jobtypes.join("smooth.vjt"), SMOOTH).unwrap();
    fs::write(jobtypes.join("stat.vjt"), STAT).unwrap();
    fs::write(temp.path().join("study.seq"), PIPELINE).unwrap();
    fs::write(temp.path().join("subjects.ds"), SUBJECTS).unwrap();
    temp
}

fn seqc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("seqc").unwrap();
    cmd.current_dir(dir).env_remove("SEQC_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let temp = TempDir::new().unwrap();
    seqc(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_check_valid_sequence() {
    let temp = project();
    seqc(temp.path())
        .args(["check", "study.seq", "-j", "jobtypes", "-d", "subjects.ds"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sequence is valid!"))
        .stdout(predicate::str::contains("Compiled 4 job specs"));
}

#[test]
fn test_check_unknown_job_type_fails() {
    let temp = project();
    fs::write(temp.path().join("broken.seq"), "smooth\nregister\n").unwrap();
    seqc(temp.path())
        .args(["check", "broken.seq", "-j", "jobtypes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("register"));
}

#[test]
fn test_check_missing_sequence_file() {
    let temp = project();
    seqc(temp.path())
        .args(["check", "missing.seq"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Sequence file not found"));
}

#[test]
fn test_compile_json() {
    let temp = project();
    seqc(temp.path())
        .args(["compile", "study.seq", "-d", "subjects.ds", "-j", "jobtypes", "-f", "json", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"study north\""))
        .stdout(predicate::str::contains("\"jobtype\": \"smooth\""))
        .stdout(predicate::str::contains("\"sigma\": \"2\""))
        .stdout(predicate::str::contains("\"logdir\": \"/data/s2/logs\""));
}

#[test]
fn test_compile_text_lists_waits() {
    let temp = project();
    seqc(temp.path())
        .args(["compile", "study.seq", "-d", "subjects.ds", "-j", "jobtypes"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 jobs"))
        .stdout(predicate::str::contains("[2] stat (stat) waitfor 1"))
        .stdout(predicate::str::contains("[4] stat (stat) waitfor 3"));
}

#[test]
fn test_compile_several_datasets_yields_array() {
    let temp = project();
    fs::write(temp.path().join("other.ds"), "SITE=south\ns9 DIR=/data/s9\n").unwrap();
    seqc(temp.path())
        .args([
            "compile", "study.seq", "-d", "subjects.ds", "-d", "other.ds", "-j", "jobtypes", "-f", "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stdout(predicate::str::contains("study south"));
}

#[test]
fn test_compile_yaml() {
    let temp = project();
    seqc(temp.path())
        .args(["compile", "study.seq", "-d", "subjects.ds", "-j", "jobtypes", "-f", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jobtype: stat"));
}

#[test]
fn test_compile_begin_checkpoint() {
    let temp = project();
    seqc(temp.path())
        .args([
            "compile", "study.seq", "-d", "subjects.ds", "-j", "jobtypes", "-f", "json", "--begin", "stat@s2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"jnum\": 4"))
        .stdout(predicate::str::contains("/data/s1").not());
}

#[test]
fn test_compile_invalid_checkpoint() {
    let temp = project();
    seqc(temp.path())
        .args(["compile", "study.seq", "-d", "subjects.ds", "-j", "jobtypes", "--begin", "stat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid checkpoint"));
}

#[test]
fn test_compile_requires_dataset() {
    let temp = project();
    seqc(temp.path())
        .args(["compile", "study.seq", "-j", "jobtypes"])
        .assert()
        .failure();
}

#[test]
fn test_config_file_sets_log_subdir() {
    let temp = project();
    fs::write(temp.path().join("seqc.yaml"), "log_subdir: joblogs\njobtype_dirs: [jobtypes]\n").unwrap();
    seqc(temp.path())
        .args(["compile", "study.seq", "-d", "subjects.ds", "-f", "json", "--config", "seqc.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/data/s1/joblogs"));
}

#[test]
fn test_missing_config_file() {
    let temp = project();
    seqc(temp.path())
        .args(["tree", "subjects.ds", "--config", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_graph_dot() {
    let temp = project();
    seqc(temp.path())
        .args(["graph", "study.seq", "-d", "subjects.ds", "-j", "jobtypes", "-f", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph sequence"))
        .stdout(predicate::str::contains("j1 -> j2;"))
        .stdout(predicate::str::contains("j3 -> j4;"));
}

#[test]
fn test_graph_mermaid() {
    let temp = project();
    seqc(temp.path())
        .args(["graph", "study.seq", "-d", "subjects.ds", "-j", "jobtypes", "-f", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph TD"))
        .stdout(predicate::str::contains("j1 --> j2"));
}

#[test]
fn test_tree_resolved() {
    let temp = project();
    seqc(temp.path())
        .args(["tree", "subjects.ds", "--resolved"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("s1"))
        .stdout(predicate::str::contains("DIR=/data/s2"))
        .stdout(predicate::str::contains("SITE=north"));
}

#[test]
fn test_fmt_round_trips_blocks() {
    let temp = project();
    seqc(temp.path())
        .args(["fmt", "study.seq", "-j", "jobtypes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defblock pipeline"))
        .stdout(predicate::str::contains("stat name stat waitfor smooth"));
}

#[test]
fn test_directory_flag() {
    let temp = project();
    let elsewhere = TempDir::new().unwrap();
    seqc(elsewhere.path())
        .arg("-C")
        .arg(temp.path())
        .args(["check", "study.seq", "-j", "jobtypes"])
        .assert()
        .success();
}
