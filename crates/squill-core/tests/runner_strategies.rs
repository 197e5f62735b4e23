//! Cross-strategy behaviour of the lint runner, driven through the public
//! API the way an embedder would use it.

use rstest::rstest;
use squill_core::{
    get_runner, DelayedFailure, FileLintResult, LintConfig, LintError, Linter, Runner,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn linter() -> Arc<Linter> {
    Arc::new(Linter::new(LintConfig::default()))
}

fn write_files(dir: &tempfile::TempDir, files: &[(&str, &str)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, contents)| {
            let path = dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        })
        .collect()
}

fn violations_by_file(
    runner: &Runner,
    paths: &[PathBuf],
) -> Result<BTreeMap<String, Vec<String>>, LintError> {
    runner
        .run(paths, false)
        .map(|item| {
            item.map(|result| {
                let codes = result
                    .violations
                    .iter()
                    .map(|violation| violation.code.clone())
                    .collect();
                (result.name, codes)
            })
        })
        .collect()
}

#[test]
fn strategies_find_identical_violation_sets() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(
        &dir,
        &[
            ("a.sql", "select id from users\n"),
            ("b.sql", "SELECT id  \nFROM users\n"),
            ("c.sql", "SELECT (\n  1\n)\n"),
            ("d.sql", "SELECT 1\n"),
        ],
    );

    let sequential = violations_by_file(&Runner::sequential(linter()), &paths).unwrap();
    let threaded = violations_by_file(&Runner::thread_parallel(linter(), 3), &paths).unwrap();

    assert_eq!(sequential.len(), 4);
    assert_eq!(sequential, threaded);
    // sanity: the fixtures actually produce violations
    assert!(sequential.values().any(|codes| !codes.is_empty()));
    assert!(sequential.values().any(|codes| codes.is_empty()));
}

#[test]
fn one_failing_file_leaves_n_minus_one_results() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_files(
        &dir,
        &[("a.sql", "SELECT 1\n"), ("c.sql", "SELECT 2\n"), ("d.sql", "SELECT 3\n")],
    );
    let bad = dir.path().join("b.sql");
    std::fs::File::create(&bad)
        .unwrap()
        .write_all(b"SELECT \xff\xfe 1\n")
        .unwrap();
    let paths = vec![good[0].clone(), bad, good[1].clone(), good[2].clone()];

    for runner in [
        Runner::sequential(linter()),
        Runner::thread_parallel(linter(), 2),
    ] {
        let results: Vec<FileLintResult> = runner
            .run(&paths, false)
            .collect::<Result<_, _>>()
            .unwrap_or_else(|err| panic!("{}: unexpected fatal {err}", runner.strategy_name()));
        assert_eq!(results.len(), 3, "{}", runner.strategy_name());
        assert!(results.iter().all(|result| !result.name.ends_with("b.sql")));
    }
}

#[test]
fn io_failure_is_fatal_and_fuses_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = write_files(&dir, &[("a.sql", "SELECT 1\n")]);
    paths.push(dir.path().join("does-not-exist.sql"));
    paths.extend(write_files(&dir, &[("z.sql", "SELECT 2\n")]));

    let runner = Runner::sequential(linter());
    let mut stream = runner.run(&paths, false);

    assert!(stream.next().unwrap().is_ok());
    let fatal = stream.next().unwrap().unwrap_err();
    assert!(matches!(fatal, LintError::Io { .. }));
    assert!(stream.next().is_none());
}

#[test]
fn envelope_reraised_in_another_thread_keeps_kind_message_and_trace() {
    let handle = std::thread::spawn(|| {
        let failure = DelayedFailure::capture("b.sql", LintError::internal("rule exploded"));
        serde_json::to_string(&failure).unwrap()
    });
    let json = handle.join().unwrap();

    let restored: DelayedFailure = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.fname(), "b.sql");
    assert!(!restored.trace().is_empty());

    let reraised = restored.reraise();
    assert_eq!(reraised, LintError::internal("rule exploded"));
    assert_eq!(reraised.to_string(), "rule exploded");
}

#[rstest]
#[case(1, true, "sequential")]
#[case(1, false, "sequential")]
#[case(4, true, "process-parallel")]
#[case(4, false, "thread-parallel")]
fn runner_selection_policy(
    #[case] parallel: usize,
    #[case] allow_process_parallelism: bool,
    #[case] expected: &str,
) {
    let runner = get_runner(linter(), parallel, allow_process_parallelism);
    assert_eq!(runner.strategy_name(), expected);
}

#[test]
fn interrupt_terminates_a_parallel_run_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(
        &dir,
        &[("a.sql", "SELECT 1\n"), ("b.sql", "SELECT 2\n"), ("c.sql", "SELECT 3\n")],
    );

    let flag = Arc::new(AtomicBool::new(true));
    let runner = Runner::thread_parallel(linter(), 2).with_interrupt_flag(Arc::clone(&flag));

    let collected: Vec<_> = runner.run(&paths, false).collect();
    assert!(collected.is_empty());
    assert!(!flag.load(Ordering::SeqCst), "the interrupt must be consumed");
}

#[test]
fn per_directory_config_shapes_each_work_unit() {
    let dir = tempfile::tempdir().unwrap();
    let strict = dir.path().join("strict");
    std::fs::create_dir(&strict).unwrap();
    std::fs::write(
        strict.join(squill_core::CONFIG_FILENAME),
        r#"{ "disabledRules": ["LINT_CP_001"] }"#,
    )
    .unwrap();

    let paths = write_files(&dir, &[("a.sql", "select 1\n")]);
    let nested = strict.join("b.sql");
    std::fs::write(&nested, "select 1\n").unwrap();
    let all_paths = vec![paths[0].clone(), nested];

    let by_file = violations_by_file(&Runner::sequential(linter()), &all_paths).unwrap();
    let (plain, overridden): (Vec<_>, Vec<_>) = by_file
        .iter()
        .partition(|(name, _)| !name.contains("strict"));

    // same content, different effective config: only the un-overridden file
    // reports the capitalisation violation
    assert!(plain[0].1.contains(&"LINT_CP_001".to_string()));
    assert!(!overridden[0].1.contains(&"LINT_CP_001".to_string()));
}
