#![cfg(unix)]

use std::time::Duration;

use cmdrun::config::SpawnOptions;
use cmdrun::errors::CmdrunError;
use cmdrun::exec::run_standard;
use cmdrun::types::{CommandLine, Rejection};
use cmdrun_test_utils::{init_tracing, with_timeout};

fn sh(script: &str) -> CommandLine {
    CommandLine::from(["sh", "-c", script])
}

#[tokio::test]
async fn exit_zero_resolves_with_ordered_logs() {
    init_tracing();

    let handle = run_standard(
        sh("printf a; sleep 0.2; printf b"),
        &SpawnOptions::default(),
    )
    .unwrap();
    let logs = handle.logs().clone();

    let outcome = with_timeout(handle).await;
    assert_eq!(outcome, Ok(0));
    // Chunk boundaries depend on the OS; order does not.
    assert_eq!(logs.joined(), "ab");
    assert!(logs.snapshot().first().unwrap().starts_with('a'));
}

#[tokio::test]
async fn non_zero_exit_rejects_with_code() {
    init_tracing();

    let mut handle = run_standard(sh("echo oops >&2; exit 3"), &SpawnOptions::default()).unwrap();
    let outcome = with_timeout(&mut handle).await;

    assert_eq!(outcome, Err(Rejection::ExitCode(3)));
    assert_eq!(handle.errs().joined(), "oops\n");
    assert!(handle.logs().is_empty());
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() {
    init_tracing();

    let result = run_standard(
        "definitely-not-a-real-binary-cmdrun --flag",
        &SpawnOptions::default(),
    );
    match result {
        Err(CmdrunError::Spawn { command, .. }) => {
            assert_eq!(command, "definitely-not-a-real-binary-cmdrun --flag");
        }
        Err(e) => panic!("expected spawn error, got {e:?}"),
        Ok(_) => panic!("expected spawn error, got a handle"),
    }
}

#[tokio::test]
async fn text_command_is_split_into_program_and_args() {
    init_tracing();

    let mut handle = run_standard("printf %s-%s one two", &SpawnOptions::default()).unwrap();
    assert_eq!(handle.command(), "printf %s-%s one two");
    assert!(handle.pid().is_some());

    assert_eq!(with_timeout(&mut handle).await, Ok(0));
    assert_eq!(handle.logs().joined(), "one-two");
}

#[tokio::test]
async fn without_shell_metacharacters_are_literal() {
    init_tracing();

    let mut handle = run_standard("echo $HOME|x", &SpawnOptions::default()).unwrap();
    assert_eq!(with_timeout(&mut handle).await, Ok(0));
    assert_eq!(handle.logs().joined(), "$HOME|x\n");
}

#[tokio::test]
async fn shell_flag_interprets_the_command_line() {
    init_tracing();

    let options = SpawnOptions::new().shell(true).env("CMDRUN_TEST_VALUE", "42");
    let mut handle = run_standard("echo $CMDRUN_TEST_VALUE | tr 4 5", &options).unwrap();
    assert_eq!(with_timeout(&mut handle).await, Ok(0));
    assert_eq!(handle.logs().joined(), "52\n");
}

#[tokio::test]
async fn cwd_and_env_are_applied() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let options = SpawnOptions::new()
        .cwd(dir.path())
        .env("CMDRUN_GREETING", "hello");
    let mut handle = run_standard(sh("pwd; echo $CMDRUN_GREETING; echo ${PATH:+inherited}"), &options).unwrap();

    assert_eq!(with_timeout(&mut handle).await, Ok(0));
    let out = handle.logs().joined();
    let canonical = dir.path().canonicalize().unwrap();
    assert!(out.contains(canonical.to_str().unwrap()), "got {out:?}");
    assert!(out.contains("hello"));
    assert!(out.contains("inherited"));
}

#[tokio::test]
async fn output_written_just_before_exit_is_not_lost() {
    init_tracing();

    let mut handle = run_standard(sh("seq 1 2000; exit 0"), &SpawnOptions::default()).unwrap();
    assert_eq!(with_timeout(&mut handle).await, Ok(0));

    let out = handle.logs().joined();
    assert!(out.starts_with("1\n2\n"));
    assert!(out.ends_with("1999\n2000\n"));
    assert_eq!(out.lines().count(), 2000);
}

#[tokio::test]
async fn grandchild_holding_pipes_does_not_hang_settlement() {
    init_tracing();

    let started = std::time::Instant::now();
    let mut handle = run_standard(sh("(sleep 3) & echo parent"), &SpawnOptions::default()).unwrap();
    assert_eq!(with_timeout(&mut handle).await, Ok(0));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(handle.logs().joined(), "parent\n");
}

#[tokio::test]
async fn awaiting_again_returns_the_same_outcome() {
    init_tracing();

    let mut handle = run_standard(sh("exit 7"), &SpawnOptions::default()).unwrap();
    assert_eq!(with_timeout(&mut handle).await, Err(Rejection::ExitCode(7)));
    assert_eq!((&mut handle).await, Err(Rejection::ExitCode(7)));
    assert_eq!(handle.try_outcome(), Some(Err(Rejection::ExitCode(7))));
}
