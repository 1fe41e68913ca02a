#![cfg(unix)]

use std::fs;

use clap::Parser;
use cmdrun::cli::CliArgs;
use cmdrun::errors::CmdrunError;
use cmdrun::types::Rejection;
use cmdrun::{build_plan, run};
use cmdrun_test_utils::{init_tracing, with_timeout};

fn args(argv: &[&str]) -> CliArgs {
    let mut full = vec!["cmdrun"];
    full.extend_from_slice(argv);
    CliArgs::try_parse_from(full).unwrap()
}

#[tokio::test]
async fn successful_exec_returns_ok() {
    init_tracing();
    with_timeout(run(args(&["--exec", "true"]))).await.unwrap();
}

#[tokio::test]
async fn failing_exec_reports_exit_code() {
    init_tracing();
    let err = with_timeout(run(args(&["--exec", "false"])))
        .await
        .unwrap_err();

    match err {
        CmdrunError::Failed { command, rejection } => {
            assert_eq!(command, "false");
            assert_eq!(rejection, Rejection::ExitCode(1));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn serial_mode_skips_commands_after_a_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let touch = format!("touch {}", marker.display());

    let err = with_timeout(run(args(&["--exec", "false", "--exec", &touch])))
        .await
        .unwrap_err();

    assert!(matches!(err, CmdrunError::Failed { .. }));
    assert!(!marker.exists());
}

#[tokio::test]
async fn parallel_mode_runs_everything() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let touch = format!("touch {}", marker.display());

    let err = with_timeout(run(args(&[
        "--parallel",
        "--exec",
        "false",
        "--exec",
        &touch,
    ])))
    .await
    .unwrap_err();

    assert!(matches!(err, CmdrunError::Failed { .. }));
    assert!(marker.exists());
}

#[tokio::test]
async fn until_settles_before_the_command_exits() {
    init_tracing();
    with_timeout(run(args(&[
        "--shell",
        "--until",
        "READY",
        "--exec",
        "echo READY; sleep 30",
    ])))
    .await
    .unwrap();
}

#[tokio::test]
async fn dry_run_does_not_execute() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let config = dir.path().join("Cmdrun.toml");
    fs::write(
        &config,
        format!(
            "[command.touch]\ncmd = [\"touch\", \"{}\"]\n",
            marker.display()
        ),
    )
    .unwrap();

    let config = config.display().to_string();
    with_timeout(run(args(&["--config", &config, "--dry-run"])))
        .await
        .unwrap();
    assert!(!marker.exists());
}

#[test]
fn plan_from_config_respects_names_and_parallel_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Cmdrun.toml");
    fs::write(
        &config,
        r#"
[vars]
greeting = "hello"

[command.a]
cmd = "echo ${greeting}"

[command.b]
cmd = "echo b"

[command.c]
cmd = "echo c"
"#,
    )
    .unwrap();
    let config = config.display().to_string();

    let plan = build_plan(&args(&["--config", &config, "c", "a"])).unwrap();
    assert!(plan.serial);
    let names: Vec<&str> = plan.commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a"]);
    assert_eq!(plan.commands[1].command.to_string(), "echo hello");

    let plan = build_plan(&args(&["--config", &config, "--parallel"])).unwrap();
    assert!(!plan.serial);
    assert_eq!(plan.commands.len(), 3);
}

#[test]
fn serial_plan_follows_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Cmdrun.toml");
    fs::write(
        &config,
        "[command.zeta_build]\ncmd = \"echo build\"\n\n[command.alpha_deploy]\ncmd = \"echo deploy\"\n",
    )
    .unwrap();
    let config = config.display().to_string();

    let plan = build_plan(&args(&["--config", &config])).unwrap();
    assert!(plan.serial);
    let names: Vec<&str> = plan.commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["zeta_build", "alpha_deploy"]);
}

#[test]
fn exec_options_apply_to_every_exec_command() {
    let plan = build_plan(&args(&[
        "--exec",
        "one",
        "--exec",
        "two",
        "--env",
        "A=1",
        "--until",
        "ok",
    ]))
    .unwrap();

    assert_eq!(plan.commands.len(), 2);
    for (i, cmd) in plan.commands.iter().enumerate() {
        assert_eq!(cmd.name, format!("exec-{}", i + 1));
        assert_eq!(cmd.options.env["A"], "1");
        assert!(cmd.until.is_some());
    }
}

#[test]
fn exec_only_flags_require_exec() {
    assert!(CliArgs::try_parse_from(["cmdrun", "--until", "x"]).is_err());
    assert!(CliArgs::try_parse_from(["cmdrun", "--exec", "x", "--env", "NOEQ"]).is_err());
}
