use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli() -> Command {
    Command::cargo_bin("linebasic-cli").expect("binary exists")
}

#[test]
fn runs_a_program() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("hello.bas");
    fs::write(&input_path, "10 FOR I = 1 TO 3\n20 PRINT I;\n30 NEXT I\n40 PRINT\n")
        .expect("write input");

    cli()
        .arg("run")
        .arg(&input_path)
        .assert()
        .success()
        .stdout("123\n");
}

#[test]
fn runs_a_program_from_stdin() {
    cli()
        .arg("run")
        .write_stdin("10 PRINT \"HI\"\n")
        .assert()
        .success()
        .stdout("HI\n");
}

#[test]
fn reports_division_by_zero_with_its_line() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("div.bas");
    fs::write(&input_path, "10 PRINT \"BEFORE\"\n20 PRINT 1/0\n").expect("write input");

    cli()
        .arg("run")
        .arg(&input_path)
        .assert()
        .failure()
        .stdout("BEFORE\n")
        .stderr(predicate::str::contains(
            "[DIVISION_BY_ZERO] Division by zero\nLine: 20\nPRINT 1/0",
        ));
}

#[test]
fn semantic_errors_stop_before_execution() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("loop.bas");
    fs::write(&input_path, "10 PRINT \"HI\"\n20 WHILE X < 3\n30 X = X + 1\n").expect("write input");

    cli()
        .arg("run")
        .arg(&input_path)
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("[WHILE_WITHOUT_WEND]"))
        .stderr(predicate::str::contains("LINE:\nWHILE X < 3"));
}

#[test]
fn reports_json_diagnostics() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("data.bas");
    fs::write(&input_path, "10 DATA 1\n20 READ A\n30 READ B\n").expect("write input");

    let assert = cli()
        .arg("--format")
        .arg("json")
        .arg("run")
        .arg(&input_path)
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf8");
    let report: serde_json::Value = serde_json::from_str(stderr.trim()).expect("json report");
    assert_eq!(report["kind"], "runtime");
    assert_eq!(report["code"], "DATA_EXHAUSTED");
    assert_eq!(report["line"], 30);
    assert_eq!(report["line_text"], "READ B");
}

#[test]
fn checks_every_program_in_a_directory() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("good.bas"), "10 PRINT 1\n").expect("write good");
    fs::write(dir.path().join("bad.bas"), "10 NEXT I\n").expect("write bad");
    fs::write(dir.path().join("readme.txt"), "ignored").expect("write other");

    cli()
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("ok: ").and(predicate::str::contains("good.bas")))
        .stderr(predicate::str::contains("[NEXT_WITHOUT_FOR]"))
        .stderr(predicate::str::contains("readme.txt").not());
}

#[test]
fn check_succeeds_on_a_valid_file() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("ok.bas");
    fs::write(&input_path, "10 DEF FNA(X) = X * 2\n20 PRINT FNA(4)\n").expect("write input");

    cli()
        .arg("check")
        .arg(&input_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: "));
}

#[test]
fn reports_missing_input_file() {
    let dir = tempdir().expect("tempdir");

    cli()
        .arg("run")
        .arg(dir.path().join("missing.bas"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read input file"));
}

#[test]
fn reports_over_nested_expressions_instead_of_crashing() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("deep.bas");
    fs::write(&input_path, format!("10 PRINT {}1\n", "-".repeat(50_000))).expect("write input");

    cli()
        .arg("check")
        .arg(&input_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nested too deeply"));
}
