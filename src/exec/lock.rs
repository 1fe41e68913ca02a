// src/exec/lock.rs

//! Serialized execution of an async function ("lockify").
//!
//! [`lockify`] wraps `f` so that, across concurrent calls, each body starts
//! only after the previous call has finished, in call order. The queue is
//! one piece of state: the receiver half of a oneshot channel whose sender
//! is held by the most recent call. Each call swaps in its own receiver and
//! waits on the one it replaced; the sender is dropped when the call
//! finishes, fails or is cancelled, so a failing call never blocks the
//! ones behind it.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

/// An async function whose invocations never overlap.
pub struct Lockified<F> {
    f: Arc<F>,
    tail: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
}

impl<F> Clone for Lockified<F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            tail: Arc::clone(&self.tail),
        }
    }
}

/// Wrap `f` so concurrent calls run one at a time, first come first served.
///
/// Multiple arguments are passed as a tuple.
pub fn lockify<F>(f: F) -> Lockified<F> {
    Lockified {
        f: Arc::new(f),
        tail: Arc::new(Mutex::new(None)),
    }
}

impl<F> Lockified<F> {
    /// Queue a call to the wrapped function.
    ///
    /// The position in the queue is taken when `call` is invoked, not when
    /// the returned future is first polled. The future resolves to whatever
    /// `f` returned, errors included.
    pub fn call<A, Fut>(&self, args: A) -> impl Future<Output = Fut::Output> + Send + use<F, A, Fut>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        A: Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send,
    {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let previous = self
            .tail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(done_rx);
        let f = Arc::clone(&self.f);

        async move {
            if let Some(previous) = previous {
                // Err just means the previous call is over (finished or dropped).
                let _ = previous.await;
            }
            let output = f(args).await;
            drop(done_tx);
            output
        }
    }
}
