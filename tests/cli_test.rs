//! CLI integration tests for the sqlsplit binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sqlsplit() -> Command {
    Command::cargo_bin("sqlsplit").expect("binary should exist")
}

fn setup_temp_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }
    dir
}

#[test]
fn test_stdin_split() {
    sqlsplit()
        .arg("-")
        .write_stdin("select 1;\nselect 2;\n")
        .assert()
        .success()
        .stdout("query 0..9\nselect 1\nquery 10..19\nselect 2\n");
}

#[test]
fn test_control_command_output() {
    sqlsplit()
        .arg("-")
        .write_stdin("@set x = 1\nselect :x\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("control set name=x value=1"))
        .stdout(predicate::str::contains("query 11..20\nselect :x"));
}

#[test]
fn test_dialect_flag() {
    sqlsplit()
        .args(["-d", "oracle", "-"])
        .write_stdin("BEGIN\n  NULL;\nEND;\n/\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("BEGIN\n  NULL;\nEND;\n"));
}

#[test]
fn test_unknown_dialect_exits_2() {
    sqlsplit()
        .args(["--dialect", "klingon", "-"])
        .write_stdin("select 1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown dialect"));
}

#[test]
fn test_parameters_flag() {
    sqlsplit()
        .args(["--parameters", "-"])
        .write_stdin("select :a, :a from t")
        .assert()
        .success()
        .stdout(predicate::str::contains("param 0 named A at 7"))
        .stdout(predicate::str::contains("param 1 named A at 11 (repeats 0)"));
}

#[test]
fn test_cursor_flag() {
    sqlsplit()
        .args(["--cursor", "12", "-"])
        .write_stdin("select 1;\nselect 2;\n")
        .assert()
        .success()
        .stdout("query 10..19\nselect 2\n");
}

#[test]
fn test_keep_delimiters_flag() {
    sqlsplit()
        .args(["--keep-delimiters", "-"])
        .write_stdin("select 1;")
        .assert()
        .success()
        .stdout("query 0..9\nselect 1;\n");
}

#[test]
fn test_directory_with_config() {
    let dir = setup_temp_dir(&[
        ("sqlsplit.toml", "dialect = \"mysql\"\n"),
        ("a.sql", "select `a;b` from t;\n"),
        ("skip/b.sql", "select 2;\n"),
        ("notes.txt", "not sql"),
    ]);
    sqlsplit()
        .arg(dir.path())
        .args(["--exclude", "skip"])
        .assert()
        .success()
        .stdout("query 0..20\nselect `a;b` from t\n");
}

#[test]
fn test_verbose_summary() {
    let dir = setup_temp_dir(&[("a.sql", "select 1;\n@echo\n"), ("b.sql", "select 2;\n")]);
    sqlsplit()
        .arg("--verbose")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("==> "))
        .stderr(predicate::str::contains(
            "2 file(s) processed, 2 statement(s), 1 control command(s)",
        ));
}

#[test]
fn test_bad_config_exits_2() {
    let dir = setup_temp_dir(&[
        ("sqlsplit.toml", "line_length = 88\n"),
        ("a.sql", "select 1;\n"),
    ]);
    sqlsplit()
        .arg(dir.path().join("a.sql"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config option"));
}

#[test]
fn test_missing_config_path_exits_2() {
    sqlsplit()
        .args(["--config", "/nonexistent/sqlsplit.toml", "-"])
        .write_stdin("select 1")
        .assert()
        .code(2);
}
