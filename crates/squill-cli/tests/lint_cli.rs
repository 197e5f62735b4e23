//! End-to-end tests driving the squill binary.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

/// SQL that triggers LINT_CP_001 (lowercase keywords).
const SQL_WITH_VIOLATIONS: &str = "select id from users\n";

/// Clean SQL with no lint violations.
const SQL_CLEAN: &str = "SELECT id FROM users\n";

fn squill() -> Command {
    Command::new(env!("CARGO_BIN_EXE_squill"))
}

#[test]
fn lint_clean_file_passes() {
    let dir = tempdir().expect("temp dir");
    let sql_path = dir.path().join("clean.sql");
    std::fs::write(&sql_path, SQL_CLEAN).expect("write sql");

    let output = squill()
        .args([sql_path.to_str().expect("sql path")])
        .output()
        .expect("run CLI");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Expected exit 0, got: {stdout}");
    assert!(stdout.contains("PASS"), "Expected PASS in output: {stdout}");
    assert!(
        stdout.contains("0 violation(s)"),
        "Expected 0 violations: {stdout}"
    );
}

#[test]
fn lint_file_with_violations_fails() {
    let dir = tempdir().expect("temp dir");
    let sql_path = dir.path().join("bad.sql");
    std::fs::write(&sql_path, SQL_WITH_VIOLATIONS).expect("write sql");

    let output = squill()
        .args([sql_path.to_str().expect("sql path")])
        .output()
        .expect("run CLI");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        output.status.code(),
        Some(1),
        "Expected exit 1, got: {stdout}"
    );
    assert!(stdout.contains("FAIL"), "Expected FAIL in output: {stdout}");
    assert!(
        stdout.contains("LINT_CP_001"),
        "Expected LINT_CP_001: {stdout}"
    );
}

#[test]
fn missing_file_is_a_config_error() {
    let output = squill()
        .args(["/nonexistent/squill-test.sql"])
        .output()
        .expect("run CLI");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        output.status.code(),
        Some(66),
        "Expected exit 66, got stderr: {stderr}"
    );
    assert!(
        stderr.contains("squill: error:"),
        "Expected error banner: {stderr}"
    );
}

fn violations_by_file(stdout: &str) -> BTreeMap<String, Vec<String>> {
    let parsed: serde_json::Value = serde_json::from_str(stdout).expect("valid JSON output");
    parsed
        .as_array()
        .expect("JSON array")
        .iter()
        .map(|file| {
            let name = file["name"].as_str().expect("name").to_string();
            let name = name.rsplit('/').next().unwrap_or(&name).to_string();
            let codes = file["violations"]
                .as_array()
                .expect("violations")
                .iter()
                .map(|v| v["code"].as_str().expect("code").to_string())
                .collect();
            (name, codes)
        })
        .collect()
}

#[test]
fn parallel_strategies_agree_with_sequential() {
    let dir = tempdir().expect("temp dir");
    let fixtures = [
        ("a.sql", "select id from users\n"),
        ("b.sql", "SELECT id  \nFROM users\n"),
        ("c.sql", "SELECT (\n  1\n)\n"),
        ("d.sql", SQL_CLEAN),
    ];
    let mut paths = Vec::new();
    for (name, contents) in fixtures {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).expect("write sql");
        paths.push(path.to_str().expect("path").to_string());
    }

    let run = |extra: &[&str]| -> BTreeMap<String, Vec<String>> {
        let output = squill()
            .args(["--format", "json"])
            .args(extra)
            .args(&paths)
            .output()
            .expect("run CLI");
        assert_eq!(output.status.code(), Some(1));
        violations_by_file(&String::from_utf8_lossy(&output.stdout))
    };

    let sequential = run(&["--parallel", "1"]);
    let threaded = run(&["--parallel", "3", "--no-process-parallelism"]);
    let processes = run(&["--parallel", "3"]);

    assert_eq!(sequential.len(), 4);
    assert_eq!(sequential, threaded);
    assert_eq!(sequential, processes);
}

#[test]
fn soft_failure_reports_other_files_and_warns() {
    let dir = tempdir().expect("temp dir");
    let good = dir.path().join("good.sql");
    std::fs::write(&good, SQL_CLEAN).expect("write sql");
    let bad = dir.path().join("broken.sql");
    std::fs::File::create(&bad)
        .expect("create file")
        .write_all(b"SELECT \xff\xfe 1\n")
        .expect("write bytes");

    let output = squill()
        .args([
            "--format",
            "json",
            good.to_str().expect("path"),
            bad.to_str().expect("path"),
        ])
        .output()
        .expect("run CLI");

    assert_eq!(output.status.code(), Some(0), "good file is clean");

    let by_file = violations_by_file(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(by_file.len(), 1);
    assert!(by_file.contains_key("good.sql"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("broken.sql"),
        "warning must name the failed file: {stderr}"
    );
}

#[test]
fn fix_rewrites_the_file_in_place() {
    let dir = tempdir().expect("temp dir");
    let sql_path = dir.path().join("fixme.sql");
    std::fs::write(&sql_path, "select id  \nfrom users\n").expect("write sql");

    let output = squill()
        .args(["--fix", sql_path.to_str().expect("path")])
        .output()
        .expect("run CLI");

    // violations are still reported for the pre-fix text
    assert_eq!(output.status.code(), Some(1));

    let fixed = std::fs::read_to_string(&sql_path).expect("read back");
    assert_eq!(fixed, "SELECT id\nFROM users\n");
}

#[test]
fn templated_file_lints_the_rendered_sql() {
    let dir = tempdir().expect("temp dir");
    let sql_path = dir.path().join("templated.sql");
    std::fs::write(&sql_path, "SELECT id FROM {{ tbl }}\n").expect("write sql");

    let output = squill()
        .args([
            "--template",
            "jinja",
            "--template-var",
            "tbl=users",
            sql_path.to_str().expect("path"),
        ])
        .output()
        .expect("run CLI");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "Expected clean templated lint: {stdout}"
    );
    assert!(stdout.contains("PASS"));
}

#[test]
fn excluded_rules_are_not_reported() {
    let dir = tempdir().expect("temp dir");
    let sql_path = dir.path().join("bad.sql");
    std::fs::write(&sql_path, SQL_WITH_VIOLATIONS).expect("write sql");

    let output = squill()
        .args([
            "--exclude-rules",
            "LINT_CP_001",
            sql_path.to_str().expect("path"),
        ])
        .output()
        .expect("run CLI");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Expected exit 0: {stdout}");
    assert!(!stdout.contains("LINT_CP_001"));
}

#[test]
fn directory_input_lints_contained_sql_files() {
    let dir = tempdir().expect("temp dir");
    std::fs::write(dir.path().join("one.sql"), SQL_CLEAN).expect("write sql");
    std::fs::write(dir.path().join("two.sql"), SQL_CLEAN).expect("write sql");
    std::fs::write(dir.path().join("ignored.txt"), "not sql").expect("write txt");

    let output = squill()
        .args([dir.path().to_str().expect("path")])
        .output()
        .expect("run CLI");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Expected exit 0: {stdout}");
    assert!(stdout.contains("2 file(s) linted"), "{stdout}");
}

#[test]
fn stdin_is_linted_when_no_paths_are_given() {
    use std::process::Stdio;

    let mut child = squill()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn CLI");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(SQL_WITH_VIOLATIONS.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("<stdin>"), "{stdout}");
    assert!(stdout.contains("LINT_CP_001"), "{stdout}");
}
