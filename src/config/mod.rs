// src/config/mod.rs

//! Configuration loading and validation for cmdrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and spawn options (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate commands, patterns and `${var}` references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    CommandConfig, ConfigFile, ConfigSection, RawConfigFile, ResolvedCommand, SpawnOptions,
};
