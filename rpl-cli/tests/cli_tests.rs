//! Integration tests for the RPL CLI.
//!
//! These tests invoke the `rpl` binary as a subprocess and check
//! exit codes, stdout, and stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn rpl() -> Command {
    Command::cargo_bin("rpl").unwrap()
}

/// Write `source` to a file in `dir`, returning its path.
fn source_file(dir: &TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("program.rpl");
    fs::write(&path, source).unwrap();
    path
}

// ---- No-args / help ----

#[test]
fn no_args_prints_usage_and_exits_1() {
    rpl()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage: rpl"));
}

#[test]
fn help_flag_exits_0() {
    rpl()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Commands:"));
}

#[test]
fn unknown_command_exits_1() {
    rpl()
        .arg("frobnicate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown command 'frobnicate'"));
}

// ---- eval ----

#[test]
fn eval_prints_stack_bottom_first() {
    rpl()
        .args(["eval", "3 4 + \"done\""])
        .assert()
        .success()
        .stdout("7\n\"done\"\n");
}

#[test]
fn eval_compile_error_exits_1() {
    rpl()
        .args(["eval", "« 1 2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("never closed"));
}

#[test]
fn eval_runtime_error_exits_3_and_keeps_arguments() {
    rpl()
        .args(["eval", "1 0 /"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("runtime error"))
        .stdout("1\n0\n");
}

#[test]
fn eval_trapped_error_succeeds() {
    rpl()
        .args(["eval", "« 1 0 / » « ERRN » IFERR"])
        .assert()
        .success()
        .stdout("1\n0\n773\n");
}

#[test]
fn eval_halt_reports_on_stderr() {
    rpl()
        .args(["eval", "1 HALT 2"])
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("halted"));
}

#[test]
fn eval_without_text_exits_1() {
    rpl().arg("eval").assert().code(1);
}

// ---- flags ----

#[test]
fn bad_memory_flag_exits_1() {
    rpl()
        .args(["--memory", "lots", "eval", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expects a number"));
}

#[test]
fn memory_too_small_for_the_libraries_exits_1() {
    rpl()
        .args(["--memory", "8", "eval", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot"));
}

// ---- run ----

#[test]
fn run_file() {
    let dir = TempDir::new().unwrap();
    let path = source_file(&dir, "@ square a number\n5 → x « x x * »\n");
    rpl()
        .args(["run", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout("25\n");
}

#[test]
fn run_missing_file_exits_1() {
    rpl()
        .args(["run", "/nonexistent/program.rpl"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

// ---- check ----

#[test]
fn check_clean_program() {
    let dir = TempDir::new().unwrap();
    let path = source_file(&dir, "{ 1 2 } [ 1.5 2.5 ] [ 3 4 ] + \"s\" 1 → a « a »");
    rpl()
        .args(["check", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("OK: "));
}

#[test]
fn check_runtime_error_exits_3() {
    let dir = TempDir::new().unwrap();
    let path = source_file(&dir, "\"boom\" DOERR");
    rpl()
        .args(["check", path.to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("boom"));
}

#[test]
fn check_compile_error_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = source_file(&dir, "1 }");
    rpl()
        .args(["check", path.to_str().unwrap()])
        .assert()
        .code(1);
}

// ---- repl ----

#[test]
fn repl_prints_levels_after_each_line() {
    rpl()
        .arg("repl")
        .write_stdin("1 2\n+\n")
        .assert()
        .success()
        .stdout("2: 1\n1: 2\n1: 3\n");
}

#[test]
fn repl_undo_and_redo() {
    rpl()
        .arg("repl")
        .write_stdin("1\n2\n+\n:undo\n:redo\n")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("1: 3\n2: 1\n1: 2\n1: 3\n"));
}

#[test]
fn repl_halt_continue_and_kill() {
    rpl()
        .arg("repl")
        .write_stdin("1 HALT 2\n:cont\n5 HALT 6\n:kill\n:kill\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2: 1\n1: 2\n"))
        .stderr(predicate::str::contains("no halted program"));
}

#[test]
fn repl_check_and_quit() {
    rpl()
        .arg("repl")
        .write_stdin("{ 1 2 } 3\n:check\n:quit\n99\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK\n"))
        .stdout(predicate::str::contains("99").not());
}

#[test]
fn repl_errors_do_not_end_the_session() {
    rpl()
        .arg("repl")
        .write_stdin("1 0 /\n~~\n7\n")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("3: 1\n2: 0\n1: 7\n"))
        .stderr(predicate::str::contains("unknown token"));
}

#[test]
fn repl_exitrpl_ends_the_session() {
    rpl()
        .arg("repl")
        .write_stdin("EXITRPL\n5\n")
        .assert()
        .success()
        .stdout("");
}
