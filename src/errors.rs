// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Expected process failures (non-zero exit, pattern matched on stderr,
//! abort) are *not* errors at this level: they are [`Rejection`]s carried in
//! an [`Outcome`](crate::types::Outcome). `CmdrunError` covers everything that
//! stops a command from being started at all, plus the final "a command
//! failed" report produced by the CLI.

use thiserror::Error;

use crate::types::Rejection;

#[derive(Error, Debug)]
pub enum CmdrunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The process (or its output sink) could not be set up.
    #[error("Error running command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("Command not found in config: {0}")]
    CommandNotFound(String),

    #[error("{command} failed: {rejection}")]
    Failed {
        command: String,
        rejection: Rejection,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CmdrunError>;
