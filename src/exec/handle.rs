// src/exec/handle.rs

//! Settlement plumbing and the caller-facing [`ExecutionHandle`].
//!
//! - [`Settler`] is the resolve/reject capability handed to output sinks.
//!   It wraps a oneshot sender, so the first settlement wins and every later
//!   call is a no-op returning `false`.
//! - [`Transcript`] is an append-only list of output chunks shared by the
//!   runner and the caller.
//! - [`AbortHandle`] asks the runner to kill the process.
//! - [`ExecutionHandle`] is the awaitable result of one invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::debug;

use crate::types::{Outcome, Rejection};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-shot resolve/reject capability for an execution handle.
pub struct Settler<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<Outcome<T>>>>>,
}

impl<T> Clone for Settler<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Settler<T> {
    /// Create a settler and the receiver its outcome will be delivered to.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Settle with `outcome` unless already settled. Returns whether this
    /// call was the one that settled.
    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        let Some(tx) = lock(&self.tx).take() else {
            return false;
        };
        if tx.send(outcome).is_err() {
            debug!("execution handle dropped before settlement was delivered");
        }
        true
    }

    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub fn reject(&self, reason: Rejection) -> bool {
        self.settle(Err(reason))
    }

    pub fn is_settled(&self) -> bool {
        lock(&self.tx).is_none()
    }
}

/// Ordered, append-only output chunks from one stream.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    chunks: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    pub(crate) fn push(&self, chunk: String) {
        lock(&self.chunks).push(chunk);
    }

    /// Copy of all chunks received so far.
    pub fn snapshot(&self) -> Vec<String> {
        lock(&self.chunks).clone()
    }

    /// All chunks concatenated.
    pub fn joined(&self) -> String {
        lock(&self.chunks).concat()
    }

    pub fn len(&self) -> usize {
        lock(&self.chunks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.chunks).is_empty()
    }
}

/// Requests termination of a running command. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AbortHandle {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Ask the runner to kill the process.
    ///
    /// Returns `true` if the request reached a still-running invocation.
    /// Calling it again, or after the process exited, returns `false`.
    pub fn abort(&self) -> bool {
        match lock(&self.tx).take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Awaitable outcome of one command invocation.
///
/// Besides being a `Future`, the handle exposes the command string, the
/// process id, an [`AbortHandle`] and the live stdout/stderr transcripts.
/// Awaiting `&mut handle` keeps those accessible; once settled, polling
/// again yields the same outcome.
pub struct ExecutionHandle<T> {
    command: String,
    pid: Option<u32>,
    abort: AbortHandle,
    logs: Transcript,
    errs: Transcript,
    rx: oneshot::Receiver<Outcome<T>>,
    settled: Option<Outcome<T>>,
}

impl<T> ExecutionHandle<T> {
    pub(crate) fn new(
        command: String,
        pid: Option<u32>,
        abort: AbortHandle,
        logs: Transcript,
        errs: Transcript,
        rx: oneshot::Receiver<Outcome<T>>,
    ) -> Self {
        Self {
            command,
            pid,
            abort,
            logs,
            errs,
            rx,
            settled: None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Shorthand for `abort_handle().abort()`.
    pub fn abort(&self) -> bool {
        self.abort.abort()
    }

    /// Stdout chunks, shared with the runner.
    pub fn logs(&self) -> &Transcript {
        &self.logs
    }

    /// Stderr chunks, shared with the runner.
    pub fn errs(&self) -> &Transcript {
        &self.errs
    }
}

fn runner_gone() -> Rejection {
    Rejection::Process("runner stopped before settling".to_string())
}

impl<T: Clone> ExecutionHandle<T> {
    /// Non-blocking check for the outcome.
    pub fn try_outcome(&mut self) -> Option<Outcome<T>> {
        if self.settled.is_none() {
            match self.rx.try_recv() {
                Ok(outcome) => self.settled = Some(outcome),
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.settled = Some(Err(runner_gone()))
                }
            }
        }
        self.settled.clone()
    }
}

// The outcome is never pinned; only the oneshot receiver is polled.
impl<T> Unpin for ExecutionHandle<T> {}

impl<T: Clone> Future for ExecutionHandle<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(ref outcome) = this.settled {
            return Poll::Ready(outcome.clone());
        }
        let outcome = match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(_)) => Err(runner_gone()),
            Poll::Pending => return Poll::Pending,
        };
        this.settled = Some(outcome.clone());
        Poll::Ready(outcome)
    }
}
