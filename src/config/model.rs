// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::errors::{CmdrunError, Result};
use crate::exec::compile_pattern;
use crate::exec::PatternSink;
use crate::text::patch_string;
use crate::types::CommandLine;

/// How to spawn a process.
///
/// - `cwd`: working directory; `None` means the caller's current directory.
/// - `env`: variables set on top of the inherited environment.
/// - `shell`: run the joined command through `sh -c` (`cmd /C` on Windows)
///   instead of executing the program directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub shell: bool,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }
}

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// serial = true
/// env = { CI = "1" }
///
/// [vars]
/// port = "8080"
///
/// [command.server]
/// cmd = "node server.js --port ${port}"
/// until = "listening on \\d+"
///
/// [command.test]
/// cmd = ["npm", "run", "test"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Values for `${name}` placeholders in commands and env values.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// All commands from `[command.<name>]`, keyed by name, in file order.
    #[serde(default)]
    pub command: IndexMap<String, CommandConfig>,
}

/// `[config]` section: global defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Run selected commands one at a time, in order (default `true`).
    #[serde(default = "default_serial")]
    pub serial: bool,

    #[serde(default)]
    pub shell: bool,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_serial() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            serial: default_serial(),
            shell: false,
            cwd: None,
            env: BTreeMap::new(),
        }
    }
}

/// `[command.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// A string (split on spaces) or an array of tokens.
    pub cmd: CommandLine,

    /// Settle as soon as output matches this regex instead of waiting for
    /// exit. A stdout match succeeds, a stderr match fails.
    #[serde(default)]
    pub until: Option<String>,

    /// Flags for `until` (default `"g"`).
    #[serde(default)]
    pub flags: Option<String>,

    #[serde(default)]
    pub shell: Option<bool>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandConfig {
    pub fn new(cmd: impl Into<CommandLine>) -> Self {
        Self {
            cmd: cmd.into(),
            until: None,
            flags: None,
            shell: None,
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn effective_flags(&self) -> &str {
        self.flags.as_deref().unwrap_or(PatternSink::DEFAULT_FLAGS)
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub vars: BTreeMap<String, String>,
    pub command: IndexMap<String, CommandConfig>,
}

/// A command ready to hand to the runner.
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    pub name: String,
    pub command: CommandLine,
    pub options: SpawnOptions,
    pub until: Option<Regex>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        vars: BTreeMap<String, String>,
        command: IndexMap<String, CommandConfig>,
    ) -> Self {
        Self {
            config,
            vars,
            command,
        }
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.command.keys().map(String::as_str)
    }

    /// Resolve one command: interpolate `${vars}` and merge `[config]`
    /// defaults with the command's own overrides.
    pub fn resolve(&self, name: &str) -> Result<ResolvedCommand> {
        let cmd = self
            .command
            .get(name)
            .ok_or_else(|| CmdrunError::CommandNotFound(name.to_string()))?;

        let mut env: BTreeMap<String, String> = self.config.env.clone();
        env.extend(cmd.env.clone());
        let env = env
            .into_iter()
            .map(|(k, v)| (k, patch_string(&v, &self.vars)))
            .collect();

        let until = cmd
            .until
            .as_deref()
            .map(|pattern| compile_pattern(pattern, cmd.effective_flags()))
            .transpose()?;

        Ok(ResolvedCommand {
            name: name.to_string(),
            command: cmd.cmd.map_text(|s| patch_string(s, &self.vars)),
            options: SpawnOptions {
                cwd: cmd.cwd.clone().or_else(|| self.config.cwd.clone()),
                env,
                shell: cmd.shell.unwrap_or(self.config.shell),
            },
            until,
        })
    }

    /// Resolve `names` in the given order, or every command in file order
    /// when empty.
    pub fn resolve_all(&self, names: &[String]) -> Result<Vec<ResolvedCommand>> {
        if names.is_empty() {
            return self.command_names().map(|n| self.resolve(n)).collect();
        }
        names.iter().map(|n| self.resolve(n)).collect()
    }
}
