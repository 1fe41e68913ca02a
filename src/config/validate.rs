// src/config/validate.rs

use crate::config::model::{CommandConfig, ConfigFile, RawConfigFile};
use crate::errors::{CmdrunError, Result};
use crate::exec::compile_pattern;
use crate::text::placeholders;
use crate::types::CommandLine;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CmdrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.vars, raw.command))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_commands(cfg)?;
    for (name, cmd) in cfg.command.iter() {
        validate_command(cfg, name, cmd)?;
    }
    Ok(())
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.command.is_empty() {
        return Err(CmdrunError::Config(
            "config must contain at least one [command.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_command(cfg: &RawConfigFile, name: &str, cmd: &CommandConfig) -> Result<()> {
    if cmd.cmd.is_empty() {
        return Err(CmdrunError::Config(format!(
            "command '{name}' has an empty `cmd`"
        )));
    }

    let texts: Vec<&str> = match &cmd.cmd {
        CommandLine::Text(s) => vec![s.as_str()],
        CommandLine::Tokens(t) => t.iter().map(String::as_str).collect(),
    };
    for text in texts {
        for var in placeholders(text) {
            if !cfg.vars.contains_key(&var) {
                return Err(CmdrunError::Config(format!(
                    "command '{name}' references unknown variable '${{{var}}}'"
                )));
            }
        }
    }

    if let Some(ref pattern) = cmd.until {
        compile_pattern(pattern, cmd.effective_flags()).map_err(|e| match e {
            CmdrunError::Pattern(msg) => CmdrunError::Pattern(format!("command '{name}': {msg}")),
            other => other,
        })?;
    }

    Ok(())
}
