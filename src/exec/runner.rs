// src/exec/runner.rs

//! The command runner.
//!
//! [`run`] spawns one child process and returns an [`ExecutionHandle`]
//! immediately. Behind the handle, three Tokio tasks cooperate:
//!
//! - two readers, one per pipe, decode chunks as UTF-8 and forward them over
//!   a single mpsc channel (so order within a stream is preserved);
//! - a driver that owns the child and the output sink, appends each chunk to
//!   the shared transcript *before* handing it to the sink, and reacts to
//!   exit and abort requests.
//!
//! After the child exits, the driver drains buffered output (bounded by
//! [`DRAIN_GRACE`]) and only then reports the exit to the sink.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::SpawnOptions;
use crate::errors::{CmdrunError, Result};
use crate::exec::command::{build_process, parse_command};
use crate::exec::handle::{AbortHandle, ExecutionHandle, Settler, Transcript};
use crate::exec::sink::{OutputSink, PatternSink, SinkContext, StandardSink};
use crate::types::{CommandLine, PatternMatch, Rejection, StreamKind, Termination};

/// How long to keep reading output after exit when a grandchild still
/// holds the pipes open.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_BUF_SIZE: usize = 8 * 1024;

#[derive(Debug)]
enum StreamEvent {
    Chunk { kind: StreamKind, text: String },
    ReadFailed { kind: StreamKind, error: io::Error },
}

/// Run `command`, routing its output through the sink built by `make_sink`.
///
/// `make_sink` receives a [`SinkContext`]: the handle's [`Settler`], the
/// parsed command and the shared transcripts. Any extra construction
/// arguments are simply captured by the closure.
///
/// Errors are returned synchronously only when nothing could be started:
/// an empty command, a failing sink constructor, or a failing spawn (e.g.
/// the executable does not exist). Every later failure settles the handle.
pub fn run<S, F>(
    command: impl Into<CommandLine>,
    options: &SpawnOptions,
    make_sink: F,
) -> Result<ExecutionHandle<S::Output>>
where
    S: OutputSink,
    F: FnOnce(SinkContext<S::Output>) -> Result<S>,
{
    let command = command.into();
    let parsed = parse_command(&command)?;
    let spawn_error = |source: anyhow::Error| CmdrunError::Spawn {
        command: parsed.display.clone(),
        source,
    };

    let logs = Transcript::default();
    let errs = Transcript::default();
    let (settler, outcome_rx) = Settler::channel();
    let sink = make_sink(SinkContext {
        settler: settler.clone(),
        command: parsed.clone(),
        logs: logs.clone(),
        errs: errs.clone(),
    })
    .map_err(|e| spawn_error(e.into()))?;

    info!(cmd = %parsed.display, shell = options.shell, "running command");
    let mut child = build_process(&parsed, options)
        .spawn()
        .map_err(|e| spawn_error(e.into()))?;
    let pid = child.id();
    info!(cmd = %parsed.display, pid = ?pid, "command spawned");

    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(64);
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, StreamKind::Stdout, event_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, StreamKind::Stderr, event_tx.clone());
    }
    drop(event_tx);

    let (abort, abort_rx) = AbortHandle::channel();

    let driver = Driver {
        cmd: parsed.display.clone(),
        child,
        sink,
        settler,
        events: event_rx,
        logs: logs.clone(),
        errs: errs.clone(),
    };
    tokio::spawn(driver.run(abort_rx));

    Ok(ExecutionHandle::new(
        parsed.display,
        pid,
        abort,
        logs,
        errs,
        outcome_rx,
    ))
}

/// Run with a [`StandardSink`]: resolves with `0`, rejects on anything else.
pub fn run_standard(
    command: impl Into<CommandLine>,
    options: &SpawnOptions,
) -> Result<ExecutionHandle<i32>> {
    run::<StandardSink, _>(command, options, |ctx| {
        Ok(StandardSink::new(ctx.settler, ctx.command.display))
    })
}

/// Run with a [`PatternSink`]: settles as soon as `pattern` shows up.
pub fn run_until(
    command: impl Into<CommandLine>,
    options: &SpawnOptions,
    pattern: &str,
    flags: &str,
) -> Result<ExecutionHandle<PatternMatch>> {
    run::<PatternSink, _>(command, options, |ctx| {
        PatternSink::new(ctx.settler, ctx.command.display, pattern, flags)
    })
}

fn spawn_reader<R>(mut reader: R, kind: StreamKind, tx: mpsc::Sender<StreamEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUF_SIZE];
        let mut decoder = Utf8Chunker::default();
        loop {
            let event = match reader.read(&mut buf).await {
                Ok(0) => {
                    if let Some(text) = decoder.finish() {
                        let _ = tx.send(StreamEvent::Chunk { kind, text }).await;
                    }
                    break;
                }
                Ok(n) => match decoder.push(&buf[..n]) {
                    Some(text) => StreamEvent::Chunk { kind, text },
                    None => continue,
                },
                Err(error) => {
                    let _ = tx.send(StreamEvent::ReadFailed { kind, error }).await;
                    break;
                }
            };
            if tx.send(event).await.is_err() {
                debug!(stream = %kind, "driver gone; reader stopping");
                break;
            }
        }
    });
}

struct Driver<S: OutputSink> {
    cmd: String,
    child: Child,
    sink: S,
    settler: Settler<S::Output>,
    events: mpsc::Receiver<StreamEvent>,
    logs: Transcript,
    errs: Transcript,
}

impl<S: OutputSink> Driver<S> {
    async fn run(mut self, mut abort_rx: oneshot::Receiver<()>) {
        let mut abort_open = true;
        let mut aborted = false;
        let mut streams_open = true;

        let status = loop {
            tokio::select! {
                res = &mut abort_rx, if abort_open => {
                    abort_open = false;
                    match res {
                        Ok(()) => {
                            info!(cmd = %self.cmd, "abort requested; killing process");
                            aborted = true;
                            if let Err(e) = self.child.start_kill() {
                                warn!(cmd = %self.cmd, error = %e, "failed to kill process on abort");
                            }
                        }
                        Err(_) => {
                            // Every abort handle is gone; let the process run to completion.
                            debug!(cmd = %self.cmd, "abort channel closed without request");
                        }
                    }
                }

                event = self.events.recv(), if streams_open => {
                    match event {
                        Some(event) => self.dispatch(event),
                        None => streams_open = false,
                    }
                }

                status = self.child.wait() => break status,
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                error!(cmd = %self.cmd, error = %e, "waiting for process failed");
                self.sink.errors(&e);
                // No exit will follow, so the handle is settled here.
                self.settler.reject(Rejection::Process(e.to_string()));
                return;
            }
        };

        if streams_open {
            self.drain().await;
        }

        let termination = Termination::from_status(status);
        debug!(cmd = %self.cmd, ?termination, aborted, "process terminated");
        if aborted {
            self.settler.reject(Rejection::Aborted);
        }
        self.sink.exit(termination);
    }

    async fn drain(&mut self) {
        let drained = tokio::time::timeout(DRAIN_GRACE, async {
            while let Some(event) = self.events.recv().await {
                self.dispatch(event);
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                cmd = %self.cmd,
                "output pipes still open after exit; reporting exit without waiting"
            );
        }
    }

    fn dispatch(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Chunk {
                kind: StreamKind::Stdout,
                text,
            } => {
                self.logs.push(text.clone());
                self.sink.data(&text);
            }
            StreamEvent::Chunk {
                kind: StreamKind::Stderr,
                text,
            } => {
                self.errs.push(text.clone());
                self.sink.error(&text);
            }
            StreamEvent::ReadFailed { kind, error } => {
                warn!(cmd = %self.cmd, stream = %kind, error = %error, "reading process output failed");
                self.sink.errors(&error);
            }
        }
    }
}

/// Incremental UTF-8 decoder that keeps an incomplete trailing sequence
/// for the next read instead of mangling it.
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);

        // Invalid sequences anywhere become U+FFFD; only a truncated
        // sequence at the very end is held back.
        let mut text = String::new();
        let mut rest: &[u8] = &self.pending;
        let keep = loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break 0;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(n) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[n..];
                        }
                        None => break after.len(),
                    }
                }
            }
        };

        let tail = self.pending.split_off(self.pending.len() - keep);
        self.pending = tail;
        (!text.is_empty()).then_some(text)
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}
