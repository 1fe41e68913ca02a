// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdrun",
    version,
    about = "Run shell commands with streamed, pattern-aware output handling.",
    long_about = None
)]
pub struct CliArgs {
    /// Names of `[command.<name>]` entries to run, in order.
    ///
    /// If omitted, every command in the config file is run.
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Cmdrun.toml` in the current working directory, or
    /// `CMDRUN_CONFIG` if set.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run an ad-hoc command instead of the config file. Repeatable.
    #[arg(long = "exec", value_name = "CMD")]
    pub exec: Vec<String>,

    /// With `--exec`: consider a command done once its output matches REGEX.
    #[arg(long, value_name = "REGEX", requires = "exec")]
    pub until: Option<String>,

    /// With `--exec`: run through the platform shell.
    #[arg(long, requires = "exec")]
    pub shell: bool,

    /// With `--exec`: working directory.
    #[arg(long, value_name = "DIR", requires = "exec")]
    pub cwd: Option<PathBuf>,

    /// With `--exec`: extra environment variable. Repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val, requires = "exec")]
    pub env: Vec<(String, String)>,

    /// Start all commands at once instead of one after another.
    #[arg(long)]
    pub parallel: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the commands, but don't execute any of them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exec_with_env() {
        let args = CliArgs::try_parse_from([
            "cmdrun", "--exec", "echo hi", "--env", "A=1", "--env", "B=x=y",
        ])
        .unwrap();
        assert_eq!(args.exec, vec!["echo hi"]);
        assert_eq!(
            args.env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string())
            ]
        );
    }

    #[test]
    fn until_requires_exec() {
        assert!(CliArgs::try_parse_from(["cmdrun", "--until", "READY"]).is_err());
    }

    #[test]
    fn bad_env_is_rejected() {
        assert!(CliArgs::try_parse_from(["cmdrun", "--exec", "x", "--env", "NOEQ"]).is_err());
    }
}
