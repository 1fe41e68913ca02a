use std::fmt;

use serde::Deserialize;

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// How a child process ended, as reported to an output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with a status code.
    Exited(i32),
    /// Killed by a signal (unix only).
    Signaled(i32),
    /// The platform reported neither a code nor a signal.
    Unknown,
}

impl Termination {
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Termination::Signaled(sig);
            }
        }
        Termination::Unknown
    }
}

/// Why an execution handle was rejected.
///
/// Each variant is a distinct failure path so callers can match on it
/// instead of inspecting error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Process exited with a non-zero status code.
    ExitCode(i32),
    /// Process was terminated by a signal we did not send.
    Signal(i32),
    /// The handle's abort capability was used.
    Aborted,
    /// A pattern sink matched this text on stderr.
    Matched(String),
    /// Process-level failure with no exit status to report.
    Process(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ExitCode(code) => write!(f, "Exit code {code}"),
            Rejection::Signal(sig) => write!(f, "terminated by signal {sig}"),
            Rejection::Aborted => f.write_str("aborted"),
            Rejection::Matched(text) => write!(f, "matched on stderr: {text}"),
            Rejection::Process(msg) => write!(f, "process error: {msg}"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Settled value of an execution handle.
pub type Outcome<T> = std::result::Result<T, Rejection>;

/// Successful settlement of a pattern sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternMatch {
    /// The pattern matched this text on stdout before the process exited.
    Matched(String),
    /// The pattern never matched; the process exited with this (zero) code.
    Exited(i32),
}

impl PatternMatch {
    pub fn matched(&self) -> Option<&str> {
        match self {
            PatternMatch::Matched(text) => Some(text),
            PatternMatch::Exited(_) => None,
        }
    }
}

/// A command line: either a single string split on spaces, or pre-split
/// tokens for arguments that contain spaces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Text(String),
    Tokens(Vec<String>),
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Text(s) => s.trim().is_empty(),
            CommandLine::Tokens(t) => t.iter().all(|s| s.is_empty()),
        }
    }

    /// Apply `f` to the text or to every token.
    pub fn map_text(&self, mut f: impl FnMut(&str) -> String) -> CommandLine {
        match self {
            CommandLine::Text(s) => CommandLine::Text(f(s)),
            CommandLine::Tokens(t) => CommandLine::Tokens(t.iter().map(|s| f(s)).collect()),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Text(s) => f.write_str(s),
            CommandLine::Tokens(t) => f.write_str(&t.join(" ")),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(s: &str) -> Self {
        CommandLine::Text(s.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(s: String) -> Self {
        CommandLine::Text(s)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(t: Vec<String>) -> Self {
        CommandLine::Tokens(t)
    }
}

impl From<&[&str]> for CommandLine {
    fn from(t: &[&str]) -> Self {
        CommandLine::Tokens(t.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(t: [&str; N]) -> Self {
        CommandLine::Tokens(t.iter().map(|s| s.to_string()).collect())
    }
}
