// src/exec/sink.rs

//! Output sinks: pluggable consumers of a process's streamed output.
//!
//! The runner forwards every stdout chunk to [`OutputSink::data`], every
//! stderr chunk to [`OutputSink::error`], process-level failures to
//! [`OutputSink::errors`] and, last, the termination to [`OutputSink::exit`].
//! Callbacks for one invocation never run concurrently.
//!
//! A sink decides when the handle settles through the [`Settler`] it was
//! constructed with:
//!
//! - [`StandardSink`] settles on exit only (0 resolves, anything else
//!   rejects).
//! - [`PatternSink`] additionally settles as soon as a chunk matches its
//!   regex: a stdout match resolves, a stderr match rejects.

use std::io;

use regex::{Regex, RegexBuilder};
use tracing::{debug, error, info, trace, warn};

use crate::errors::{CmdrunError, Result};
use crate::exec::command::ParsedCommand;
use crate::exec::handle::{Settler, Transcript};
use crate::style::paint;
use crate::types::{PatternMatch, Rejection, StreamKind, Termination};

/// Everything a sink factory gets from the runner.
///
/// `logs` and `errs` are the same transcripts the caller sees on the
/// handle; the runner appends each chunk before calling the sink.
pub struct SinkContext<T> {
    pub settler: Settler<T>,
    pub command: ParsedCommand,
    pub logs: Transcript,
    pub errs: Transcript,
}

/// Consumer of one invocation's output events.
pub trait OutputSink: Send + 'static {
    /// Value the handle resolves with on success.
    type Output: Send + 'static;

    /// A chunk of stdout.
    fn data(&mut self, chunk: &str);

    /// A chunk of stderr.
    fn error(&mut self, chunk: &str);

    /// A process-level error (e.g. a broken pipe). Exit still follows.
    fn errors(&mut self, err: &io::Error);

    /// The process terminated; called exactly once, after all output.
    fn exit(&mut self, termination: Termination);
}

pub(crate) fn log_chunk(cmd: &str, kind: StreamKind, chunk: &str) {
    let chunk = chunk.trim_end_matches(['\r', '\n']);
    match kind {
        StreamKind::Stdout => info!(cmd = %cmd, "{kind}: {chunk}"),
        StreamKind::Stderr => warn!(cmd = %cmd, "{}: {chunk}", paint("ERROR").red()),
    }
}

fn log_process_error(cmd: &str, err: &io::Error) {
    error!(
        cmd = %cmd,
        error = %err,
        "{}: Error executing command: {err}",
        paint("ERROR").red()
    );
}

/// Map a termination to a settlement, log it, and apply it.
///
/// `success` is the value resolved on exit code 0.
fn settle_on_exit<T>(settler: &Settler<T>, cmd: &str, termination: Termination, success: T) {
    let outcome = match termination {
        Termination::Exited(0) => {
            info!(cmd = %cmd, "command exited code : {}", paint(0).green());
            Ok(success)
        }
        Termination::Exited(code) => {
            info!(cmd = %cmd, "command exited code : {}", paint(code).red());
            Err(Rejection::ExitCode(code))
        }
        Termination::Signaled(sig) => {
            info!(cmd = %cmd, "command terminated by signal {}", paint(sig).red());
            Err(Rejection::Signal(sig))
        }
        Termination::Unknown => {
            info!(cmd = %cmd, "command exited without status");
            Err(Rejection::Process("exited without status".to_string()))
        }
    };

    let summary = outcome.as_ref().err().map(ToString::to_string);
    if !settler.settle(outcome) {
        debug!(cmd = %cmd, "exit after settlement; ignoring");
        return;
    }
    match summary {
        None => info!(
            cmd = %cmd,
            "{cmd} executed successfully: {}",
            paint("ran to completion").green()
        ),
        Some(reason) => error!(cmd = %cmd, "{cmd} failed to execute: {}", paint(reason).red()),
    }
}

/// Sink that logs everything and settles on exit with the exit code.
pub struct StandardSink {
    cmd: String,
    settler: Settler<i32>,
}

impl StandardSink {
    pub fn new(settler: Settler<i32>, cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            settler,
        }
    }
}

impl OutputSink for StandardSink {
    type Output = i32;

    fn data(&mut self, chunk: &str) {
        log_chunk(&self.cmd, StreamKind::Stdout, chunk);
    }

    fn error(&mut self, chunk: &str) {
        log_chunk(&self.cmd, StreamKind::Stderr, chunk);
    }

    // Does not settle: exit always follows and decides.
    fn errors(&mut self, err: &io::Error) {
        log_process_error(&self.cmd, err);
    }

    fn exit(&mut self, termination: Termination) {
        settle_on_exit(&self.settler, &self.cmd, termination, 0);
    }
}

/// Compile `pattern` with JavaScript-style `flags`.
///
/// `i`, `m`, `s`, `x` and `U` map onto the regex builder. `g` and `y` only
/// affect match cursors, which a stateless `Regex` does not have, so they
/// are accepted and ignored.
pub fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'U' => builder.swap_greed(true),
            'g' | 'y' => &mut builder,
            other => {
                return Err(CmdrunError::Pattern(format!(
                    "unsupported regex flag '{other}' in '{flags}'"
                )));
            }
        };
    }
    builder
        .build()
        .map_err(|e| CmdrunError::Pattern(format!("'{pattern}': {e}")))
}

/// Sink that settles as soon as a chunk matches its pattern.
///
/// The pattern is applied to each chunk on its own; a marker split across
/// two reads is not seen.
pub struct PatternSink {
    cmd: String,
    settler: Settler<PatternMatch>,
    regex: Regex,
}

impl PatternSink {
    /// Default flags, kept for parity with callers passing `"g"`.
    pub const DEFAULT_FLAGS: &'static str = "g";

    pub fn new(
        settler: Settler<PatternMatch>,
        cmd: impl Into<String>,
        pattern: &str,
        flags: &str,
    ) -> Result<Self> {
        let regex = compile_pattern(pattern, flags)?;
        Ok(Self::from_regex(settler, cmd, regex))
    }

    pub fn from_regex(settler: Settler<PatternMatch>, cmd: impl Into<String>, regex: Regex) -> Self {
        Self {
            cmd: cmd.into(),
            settler,
            regex,
        }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    fn test(&self, chunk: &str) -> Option<String> {
        let found = self.regex.find(chunk).map(|m| m.as_str().to_string());
        if found.is_none() {
            trace!(cmd = %self.cmd, pattern = %self.regex, "no match in chunk");
        }
        found
    }
}

impl OutputSink for PatternSink {
    type Output = PatternMatch;

    fn data(&mut self, chunk: &str) {
        log_chunk(&self.cmd, StreamKind::Stdout, chunk);
        if let Some(text) = self.test(chunk) {
            if self.settler.resolve(PatternMatch::Matched(text.clone())) {
                info!(
                    cmd = %self.cmd,
                    "{} executed successfully: {}",
                    self.cmd,
                    paint(text).green()
                );
            }
        }
    }

    fn error(&mut self, chunk: &str) {
        log_chunk(&self.cmd, StreamKind::Stderr, chunk);
        if let Some(text) = self.test(chunk) {
            if self.settler.reject(Rejection::Matched(text.clone())) {
                error!(
                    cmd = %self.cmd,
                    "{} failed to execute: {}",
                    self.cmd,
                    paint(text).red()
                );
            }
        }
    }

    fn errors(&mut self, err: &io::Error) {
        log_process_error(&self.cmd, err);
    }

    fn exit(&mut self, termination: Termination) {
        let code = match termination {
            Termination::Exited(code) => code,
            _ => -1,
        };
        settle_on_exit(&self.settler, &self.cmd, termination, PatternMatch::Exited(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn standard_sink_resolves_on_zero() {
        let (settler, rx) = Settler::channel();
        let mut sink = StandardSink::new(settler, "true");
        sink.data("hello\n");
        sink.exit(Termination::Exited(0));
        assert_eq!(rx.await.unwrap(), Ok(0));
    }

    #[tokio::test]
    async fn standard_sink_rejects_with_code_or_signal() {
        let (settler, rx) = Settler::channel();
        StandardSink::new(settler, "false").exit(Termination::Exited(3));
        assert_eq!(rx.await.unwrap(), Err(Rejection::ExitCode(3)));

        let (settler, rx) = Settler::channel();
        StandardSink::new(settler, "sleep").exit(Termination::Signaled(9));
        assert_eq!(rx.await.unwrap(), Err(Rejection::Signal(9)));
    }

    // A process error is logged only; settlement waits for exit.
    #[test]
    fn standard_sink_errors_do_not_settle() {
        let (settler, _rx) = Settler::channel();
        let mut sink = StandardSink::new(settler.clone(), "x");
        sink.errors(&io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        sink.error("stderr noise");
        assert!(!settler.is_settled());
        sink.exit(Termination::Exited(0));
        assert!(settler.is_settled());
    }

    #[tokio::test]
    async fn pattern_sink_resolves_on_stdout_match() {
        let (settler, rx) = Settler::channel();
        let mut sink = PatternSink::new(settler, "server", "READY", "g").unwrap();
        sink.data("starting...\n");
        sink.data("READY\n");
        sink.exit(Termination::Exited(1));
        assert_eq!(rx.await.unwrap(), Ok(PatternMatch::Matched("READY".into())));
    }

    #[tokio::test]
    async fn pattern_sink_rejects_on_stderr_match() {
        let (settler, rx) = Settler::channel();
        let mut sink = PatternSink::new(settler, "x", r"fatal: \w+", "").unwrap();
        sink.error("fatal: nope\n");
        sink.exit(Termination::Exited(0));
        assert_eq!(
            rx.await.unwrap(),
            Err(Rejection::Matched("fatal: nope".into()))
        );
    }

    #[tokio::test]
    async fn pattern_is_evaluated_fresh_per_chunk() {
        let (settler, _rx) = Settler::channel();
        let sink = PatternSink::new(settler, "x", "ab", "g").unwrap();
        assert_eq!(sink.test("ab"), Some("ab".into()));
        assert_eq!(sink.test("ab"), Some("ab".into()));
        assert_eq!(sink.test("xx"), None);
    }

    #[tokio::test]
    async fn pattern_sink_without_match_settles_on_exit() {
        let (settler, rx) = Settler::channel();
        let mut sink = PatternSink::new(settler, "x", "READY", "g").unwrap();
        sink.data("nothing here");
        sink.exit(Termination::Exited(0));
        assert_eq!(rx.await.unwrap(), Ok(PatternMatch::Exited(0)));
    }

    #[test]
    fn flags_are_mapped() {
        let re = compile_pattern("ready", "gi").unwrap();
        assert!(re.is_match("READY"));
        assert!(!compile_pattern("ready", "g").unwrap().is_match("READY"));
        assert!(matches!(
            compile_pattern("ready", "q"),
            Err(CmdrunError::Pattern(_))
        ));
        assert!(matches!(compile_pattern("(", ""), Err(CmdrunError::Pattern(_))));
    }
}
