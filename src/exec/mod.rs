// src/exec/mod.rs

//! Process execution layer.
//!
//! This module spawns commands with `tokio::process::Command`, streams their
//! output into pluggable sinks and hands callers an awaitable handle.
//!
//! - [`command`] tokenizes command lines and builds the OS process.
//! - [`handle`] owns settlement: [`Settler`], [`Transcript`], [`AbortHandle`]
//!   and the caller-facing [`ExecutionHandle`].
//! - [`sink`] defines the [`OutputSink`] trait with the standard and
//!   pattern-matching implementations.
//! - [`runner`] wires a child process to a sink ([`run`], [`run_standard`],
//!   [`run_until`]).
//! - [`lock`] provides [`lockify`] for running commands one at a time.

pub mod command;
pub mod handle;
pub mod lock;
pub mod runner;
pub mod sink;

pub use command::{parse_command, ParsedCommand};
pub use handle::{AbortHandle, ExecutionHandle, Settler, Transcript};
pub use lock::{lockify, Lockified};
pub use runner::{run, run_standard, run_until};
pub use sink::{compile_pattern, OutputSink, PatternSink, SinkContext, StandardSink};
