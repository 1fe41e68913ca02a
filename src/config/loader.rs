// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// command and pattern checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - at least one command,
///   - non-empty `cmd` values,
///   - `${var}` references without a `[vars]` entry,
///   - `until` patterns that do not compile.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Cmdrun.toml` in the current working directory, unless `CMDRUN_CONFIG`
/// points elsewhere.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("CMDRUN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Cmdrun.toml"))
}
