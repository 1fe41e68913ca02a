// src/exec/command.rs

//! Command-line tokenization and `tokio::process::Command` construction.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::SpawnOptions;
use crate::errors::{CmdrunError, Result};
use crate::types::CommandLine;

/// A command split into program and arguments, plus the joined form used in
/// log messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub display: String,
}

/// Split a command into `[program, ...args]`.
///
/// Text commands are split on single spaces, exactly: an argument that
/// itself contains a space must be passed as `CommandLine::Tokens`.
/// Empty tokens produced by repeated spaces are kept, matching a plain split.
pub fn parse_command(command: &CommandLine) -> Result<ParsedCommand> {
    if command.is_empty() {
        return Err(CmdrunError::Config("command must not be empty".to_string()));
    }

    let tokens: Vec<String> = match command {
        CommandLine::Text(s) => s.split(' ').map(str::to_string).collect(),
        CommandLine::Tokens(t) => t.clone(),
    };

    let display = tokens.join(" ");
    let mut iter = tokens.into_iter();
    let program = iter.next().unwrap_or_default();

    Ok(ParsedCommand {
        program,
        args: iter.collect(),
        display,
    })
}

/// Build the process for `parsed` with piped output.
///
/// With `shell = true` the joined command line is handed to the platform
/// shell, so metacharacters are interpreted; otherwise the program is
/// executed directly.
pub(crate) fn build_process(parsed: &ParsedCommand, options: &SpawnOptions) -> Command {
    let mut cmd = if options.shell {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&parsed.display);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&parsed.display);
            c
        }
    } else {
        let mut c = Command::new(&parsed.program);
        c.args(&parsed.args);
        c
    };

    if let Some(ref cwd) = options.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&options.env);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_on_spaces() {
        let parsed = parse_command(&"git status --porcelain".into()).unwrap();
        assert_eq!(parsed.program, "git");
        assert_eq!(parsed.args, vec!["status", "--porcelain"]);
        assert_eq!(parsed.display, "git status --porcelain");
    }

    #[test]
    fn tokens_pass_through() {
        let parsed = parse_command(&["git", "commit", "-m", "two words"].into()).unwrap();
        assert_eq!(parsed.program, "git");
        assert_eq!(parsed.args, vec!["commit", "-m", "two words"]);
        assert_eq!(parsed.display, "git commit -m two words");
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            parse_command(&"".into()),
            Err(CmdrunError::Config(_))
        ));
        assert!(parse_command(&CommandLine::Tokens(vec![])).is_err());
    }

    #[test]
    fn quoted_text_is_not_special() {
        let parsed = parse_command(&r#"echo "a b""#.into()).unwrap();
        assert_eq!(parsed.args, vec![r#""a"#, r#"b""#]);
    }
}
