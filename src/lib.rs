// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod style;
pub mod text;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, ResolvedCommand, SpawnOptions};
use crate::errors::{CmdrunError, Result};
use crate::exec::{compile_pattern, lockify, run_standard, AbortHandle, PatternSink};
use crate::text::pad_end;
use crate::types::CommandLine;

/// The commands selected for one invocation of the CLI.
#[derive(Debug, Clone)]
pub struct Plan {
    pub commands: Vec<ResolvedCommand>,
    /// Run one at a time (through `lockify`) and stop after the first failure.
    pub serial: bool,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - ad-hoc `--exec` commands or config loading
/// - serialized or parallel execution
/// - Ctrl-C handling (aborts every running command)
pub async fn run(args: CliArgs) -> Result<()> {
    let plan = build_plan(&args)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    execute_plan(plan).await
}

/// Turn CLI arguments into a [`Plan`].
pub fn build_plan(args: &CliArgs) -> Result<Plan> {
    if !args.exec.is_empty() {
        if !args.names.is_empty() {
            warn!(names = ?args.names, "command names are ignored when --exec is given");
        }

        let options = SpawnOptions {
            cwd: args.cwd.clone(),
            env: args.env.iter().cloned().collect(),
            shell: args.shell,
        };
        let until = args
            .until
            .as_deref()
            .map(|p| compile_pattern(p, PatternSink::DEFAULT_FLAGS))
            .transpose()?;

        let commands = args
            .exec
            .iter()
            .enumerate()
            .map(|(i, cmd)| ResolvedCommand {
                name: format!("exec-{}", i + 1),
                command: CommandLine::Text(cmd.clone()),
                options: options.clone(),
                until: until.clone(),
            })
            .collect();

        return Ok(Plan {
            commands,
            serial: !args.parallel,
        });
    }

    let path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&path)?;
    debug!(config = %path.display(), commands = cfg.command.len(), "config loaded");

    Ok(Plan {
        commands: cfg.resolve_all(&args.names)?,
        serial: cfg.config.serial && !args.parallel,
    })
}

/// State shared by every command of one plan.
#[derive(Clone, Default)]
struct ExecContext {
    aborts: Arc<Mutex<Vec<AbortHandle>>>,
    halted: Arc<AtomicBool>,
    stop_on_failure: bool,
}

impl ExecContext {
    fn register(&self, abort: AbortHandle) {
        self.aborts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(abort);
    }

    fn abort_all(&self) {
        self.halted.store(true, Ordering::SeqCst);
        let aborts = self.aborts.lock().unwrap_or_else(PoisonError::into_inner);
        for abort in aborts.iter() {
            abort.abort();
        }
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}

/// Run every command in `plan` and report the first failure.
pub async fn execute_plan(plan: Plan) -> Result<()> {
    let ctx = ExecContext {
        stop_on_failure: plan.serial,
        ..ExecContext::default()
    };

    // Ctrl-C → abort everything still running.
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; aborting running commands");
            ctx.abort_all();
        });
    }

    let mut tasks = Vec::with_capacity(plan.commands.len());
    if plan.serial {
        let locked = {
            let ctx = ctx.clone();
            lockify(move |cmd: ResolvedCommand| execute_command(cmd, ctx.clone()))
        };
        for cmd in plan.commands {
            let name = cmd.name.clone();
            tasks.push((name, tokio::spawn(locked.call(cmd))));
        }
    } else {
        for cmd in plan.commands {
            let name = cmd.name.clone();
            tasks.push((name, tokio::spawn(execute_command(cmd, ctx.clone()))));
        }
    }

    let mut first_error = None;
    for (name, task) in tasks {
        let result = task
            .await
            .map_err(|e| CmdrunError::Other(anyhow::Error::from(e)))?;
        if let Err(err) = result {
            error!(command = %name, error = %err, "command failed");
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn execute_command(cmd: ResolvedCommand, ctx: ExecContext) -> Result<()> {
    if ctx.is_halted() {
        warn!(command = %cmd.name, "skipping: an earlier command failed or was aborted");
        return Ok(());
    }

    let result = execute_command_inner(cmd, &ctx).await;
    if result.is_err() && ctx.stop_on_failure {
        ctx.halted.store(true, Ordering::SeqCst);
    }
    result
}

async fn execute_command_inner(cmd: ResolvedCommand, ctx: &ExecContext) -> Result<()> {
    let cmd_line = cmd.command.to_string();
    info!(command = %cmd.name, cmd = %cmd_line, "starting command");

    let outcome = match cmd.until {
        None => {
            let handle = run_standard(cmd.command, &cmd.options)?;
            ctx.register(handle.abort_handle());
            handle.await.map(|_| ())
        }
        Some(regex) => {
            let handle = exec::run::<PatternSink, _>(cmd.command, &cmd.options, move |sink_ctx| {
                Ok(PatternSink::from_regex(
                    sink_ctx.settler,
                    sink_ctx.command.display,
                    regex,
                ))
            })?;
            ctx.register(handle.abort_handle());
            handle.await.map(|m| {
                if let Some(text) = m.matched() {
                    info!(command = %cmd.name, matched = %text, "pattern matched; command left running");
                }
            })
        }
    };

    outcome.map_err(|rejection| CmdrunError::Failed {
        command: cmd_line,
        rejection,
    })
}

/// Simple dry-run output: print the resolved commands.
fn print_dry_run(plan: &Plan) {
    println!("cmdrun dry-run");
    println!("  serial = {}", plan.serial);
    println!();

    println!("commands ({}):", plan.commands.len());
    let width = plan
        .commands
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);
    for cmd in plan.commands.iter() {
        println!("  - {} {}", pad_end(&cmd.name, width, ' '), cmd.command);
        if cmd.options.shell {
            println!("      shell: true");
        }
        if let Some(ref cwd) = cmd.options.cwd {
            println!("      cwd: {}", cwd.display());
        }
        if !cmd.options.env.is_empty() {
            println!("      env: {:?}", cmd.options.env);
        }
        if let Some(ref until) = cmd.until {
            println!("      until: {until}");
        }
    }

    debug!("dry-run complete (no execution)");
}
