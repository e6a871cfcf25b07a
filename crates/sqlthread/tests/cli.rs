// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the `sqlthread` binary.

use std::io::Write;
use std::process::{Command, Output};

fn sqlthread(args: &[&str], config: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlthread"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "off")
        .env_remove("SQLTHREAD_CONNECTION_DATABASE")
        .output()
        .expect("binary should start")
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn run_prints_rows_as_json_lines() {
    let config = config_file("[connection]\ndatabase = \":memory:\"\n");
    let output = sqlthread(
        &["run", "SELECT 1 AS a, 'x' AS b UNION ALL SELECT 2, 'y'"],
        config.path(),
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec![r#"{"a":1,"b":"x"}"#, r#"{"a":2,"b":"y"}"#]);
}

#[test]
fn run_against_a_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");
    let db = db.to_str().unwrap();
    let config = config_file("");
    let run = |sql: &str| sqlthread(&["run", sql, "--database", db], config.path());

    assert!(run("CREATE TABLE t (v TEXT)").status.success());
    assert!(run("INSERT INTO t VALUES ('kept')").status.success());

    let select = run("SELECT v FROM t");
    assert!(select.status.success());
    let stdout = String::from_utf8(select.stdout).unwrap();
    assert_eq!(stdout.trim(), r#"{"v":"kept"}"#);
}

#[test]
fn run_exits_non_zero_on_driver_failure() {
    let config = config_file("");
    let output = sqlthread(&["run", "SELECT * FROM nowhere"], config.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere"));
}

#[test]
fn check_accepts_a_valid_file() {
    let config = config_file("[query]\nforward_only = true\n");
    let output = sqlthread(&["check"], config.path());
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("forward_only:    true"));
    assert!(stdout.contains("configuration ok"));
}

#[test]
fn check_renders_diagnostics_for_typos() {
    let config = config_file("[connection]\ndatabse = \"x.db\"\n");
    let output = sqlthread(&["check"], config.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("databse"), "stderr: {stderr}");
    assert!(stderr.contains("database"), "stderr: {stderr}");
}
