use std::io;
use std::sync::{Arc, Mutex};

use cmdrun::exec::{OutputSink, Settler, SinkContext, Transcript};
use cmdrun::types::{Rejection, Termination};

/// One callback received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// Stdout chunk, with the stdout transcript length seen at that moment.
    Data { chunk: String, logs_len: usize },
    Error(String),
    Errors(String),
    Exit(Termination),
}

/// A sink that:
/// - records every callback in order into a shared list
/// - resolves with `label` on exit 0 and rejects otherwise.
///
/// `label` and `events` are the extra construction arguments a caller
/// forwards through the sink factory.
pub struct RecordingSink {
    settler: Settler<String>,
    logs: Transcript,
    label: String,
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new(
        ctx: SinkContext<String>,
        label: impl Into<String>,
        events: Arc<Mutex<Vec<SinkEvent>>>,
    ) -> Self {
        Self {
            settler: ctx.settler,
            logs: ctx.logs,
            label: label.into(),
            events,
        }
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl OutputSink for RecordingSink {
    type Output = String;

    fn data(&mut self, chunk: &str) {
        self.record(SinkEvent::Data {
            chunk: chunk.to_string(),
            logs_len: self.logs.len(),
        });
    }

    fn error(&mut self, chunk: &str) {
        self.record(SinkEvent::Error(chunk.to_string()));
    }

    fn errors(&mut self, err: &io::Error) {
        self.record(SinkEvent::Errors(err.to_string()));
    }

    fn exit(&mut self, termination: Termination) {
        self.record(SinkEvent::Exit(termination));
        match termination {
            Termination::Exited(0) => self.settler.resolve(self.label.clone()),
            Termination::Exited(code) => self.settler.reject(Rejection::ExitCode(code)),
            Termination::Signaled(sig) => self.settler.reject(Rejection::Signal(sig)),
            Termination::Unknown => self
                .settler
                .reject(Rejection::Process("unknown termination".into())),
        };
    }
}
