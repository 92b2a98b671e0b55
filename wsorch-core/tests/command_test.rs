use std::env;
use std::fs;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use wsorch_core::command::{shell_quote, CommandRunner};
use wsorch_core::error::Error;
use wsorch_core::scheduler::map_concurrent;

#[test]
fn test_run_captures_output() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();

    let output = runner
        .run("echo hello; echo oops 1>&2", temp_dir.path(), false)
        .unwrap();

    assert!(output.success);
    assert_eq!(output.exit_code, Some(0));
    assert_eq!(output.stdout, "hello\n");
    assert_eq!(output.stderr, "oops\n");
    assert_eq!(output.command, "echo hello; echo oops 1>&2");
    assert_eq!(output.cwd, temp_dir.path());
}

#[test]
fn test_run_uses_given_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("marker.txt"), "here").unwrap();
    let runner = CommandRunner::new();

    let output = runner.run("cat marker.txt", temp_dir.path(), false).unwrap();
    assert_eq!(output.stdout, "here");

    let pwd = runner.run("pwd -P", temp_dir.path(), false).unwrap();
    assert_eq!(
        pwd.stdout.trim(),
        temp_dir.path().canonicalize().unwrap().to_str().unwrap()
    );
}

#[test]
fn test_failure_is_an_error_with_context() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();

    let err = runner.run("exit 3", temp_dir.path(), false).unwrap_err();
    match err {
        Error::CommandExecution {
            command,
            path,
            message,
        } => {
            assert_eq!(command, "exit 3");
            assert_eq!(path, temp_dir.path());
            assert!(message.contains('3'));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_tolerated_failure_is_reported_not_raised() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();

    let output = runner
        .run("echo partial; exit 3", temp_dir.path(), true)
        .unwrap();
    assert!(!output.success);
    assert_eq!(output.exit_code, Some(3));
    assert_eq!(output.stdout, "partial\n");
}

#[test]
fn test_missing_working_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();
    let missing = temp_dir.path().join("missing");

    let err = runner.run("true", &missing, true).unwrap_err();
    assert!(matches!(err, Error::CommandExecution { .. }));
}

#[test]
fn test_rejects_empty_and_nul_commands() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();

    assert!(matches!(
        runner.run("   ", temp_dir.path(), false),
        Err(Error::InvalidCommand(_))
    ));
    assert!(matches!(
        runner.run("echo a\0b", temp_dir.path(), true),
        Err(Error::InvalidCommand(_))
    ));
}

#[test]
fn test_exec_and_stream_forwards_lines() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();
    let lines = Mutex::new(Vec::new());

    let output = runner
        .exec_and_stream(
            "echo one; echo two; echo three 1>&2",
            temp_dir.path(),
            false,
            |line, is_stderr| lines.lock().unwrap().push((line.to_string(), is_stderr)),
        )
        .unwrap();

    assert!(output.success);
    assert!(output.stdout.is_empty());

    let lines = lines.into_inner().unwrap();
    let stdout: Vec<&str> = lines
        .iter()
        .filter(|(_, err)| !err)
        .map(|(l, _)| l.as_str())
        .collect();
    assert_eq!(stdout, vec!["one", "two"]);
    assert!(lines.contains(&("three".to_string(), true)));
}

#[test]
fn test_exec_and_stream_failure() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new();

    assert!(runner
        .exec_and_stream("false", temp_dir.path(), false, |_, _| {})
        .is_err());

    let output = runner
        .exec_and_stream("false", temp_dir.path(), true, |_, _| {})
        .unwrap();
    assert!(!output.success);
}

#[test]
fn test_timeout_kills_command() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new().with_timeout(Some(Duration::from_millis(200)));

    let err = runner.run("sleep 5", temp_dir.path(), false).unwrap_err();
    assert!(matches!(err, Error::CommandTimeout { .. }));

    let output = runner.run("sleep 5", temp_dir.path(), true).unwrap();
    assert!(!output.success);

    let quick = runner.run("echo fast", temp_dir.path(), false).unwrap();
    assert!(quick.success);
}

#[test]
fn test_timeout_kills_compound_command() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new().with_timeout(Some(Duration::from_millis(200)));

    let started = Instant::now();
    let err = runner.run("sleep 3; true", temp_dir.path(), false).unwrap_err();
    assert!(matches!(err, Error::CommandTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());

    let started = Instant::now();
    let output = runner
        .exec_and_stream("echo begin; sleep 3; echo end", temp_dir.path(), true, |_, _| {})
        .unwrap();
    assert!(!output.success);
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
}

#[test]
fn test_timeout_kills_grandchildren() {
    let temp_dir = TempDir::new().unwrap();
    let runner = CommandRunner::new().with_timeout(Some(Duration::from_millis(100)));

    let err = runner
        .run("sh -c 'sleep 1; touch late' & wait", temp_dir.path(), false)
        .unwrap_err();
    assert!(matches!(err, Error::CommandTimeout { .. }));

    std::thread::sleep(Duration::from_millis(1500));
    assert!(!temp_dir.path().join("late").exists());
}

#[test]
fn test_shell_quote() {
    assert_eq!(shell_quote("build"), "build");
    assert_eq!(shell_quote("--filter=@scope/pkg"), "--filter=@scope/pkg");
    assert_eq!(shell_quote("a b"), "'a b'");
    assert_eq!(shell_quote(""), "''");
    assert_eq!(shell_quote("it's"), "'it'\\''s'");

    let temp_dir = TempDir::new().unwrap();
    let tricky = "two words; echo injected $HOME 'quoted'";
    let output = CommandRunner::new()
        .run(
            &format!("printf '%s\\n' {}", shell_quote(tricky)),
            temp_dir.path(),
            false,
        )
        .unwrap();
    assert_eq!(output.stdout, format!("{}\n", tricky));
}

#[test]
fn test_caller_directory_unchanged_under_concurrency() {
    let before = env::current_dir().unwrap();
    let dirs: Vec<TempDir> = (0..8).map(|_| TempDir::new().unwrap()).collect();
    let runner = CommandRunner::new();

    let outputs = map_concurrent(
        |dir: &TempDir| {
            let output = runner.run("sleep 0.05; pwd -P", dir.path(), false)?;
            Ok(output.stdout.trim().to_string())
        },
        &dirs,
        8,
    )
    .unwrap();

    for (dir, seen) in dirs.iter().zip(&outputs) {
        assert_eq!(seen, dir.path().canonicalize().unwrap().to_str().unwrap());
    }

    let failing = map_concurrent(
        |dir: &TempDir| runner.run("exit 1", dir.path(), false).map(|_| ()),
        &dirs,
        4,
    );
    assert!(failing.is_err());

    assert_eq!(env::current_dir().unwrap(), before);
}
