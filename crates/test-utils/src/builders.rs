#![allow(dead_code)]

use std::collections::BTreeMap;

use cmdrun::config::{CommandConfig, ConfigFile, ConfigSection, RawConfigFile};
use cmdrun::errors::Result;
use cmdrun::types::CommandLine;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                vars: BTreeMap::new(),
                command: Default::default(),
            },
        }
    }

    pub fn with_command(mut self, name: &str, command: CommandConfig) -> Self {
        self.config.command.insert(name.to_string(), command);
        self
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.config.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_global_env(mut self, key: &str, value: &str) -> Self {
        self.config.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn serial(mut self, val: bool) -> Self {
        self.config.config.serial = val;
        self
    }

    pub fn shell(mut self, val: bool) -> Self {
        self.config.config.shell = val;
        self
    }

    /// Validate without panicking, for tests that expect an error.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CommandConfig`.
pub struct CommandConfigBuilder {
    command: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            command: CommandConfig::new(cmd),
        }
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self {
            command: CommandConfig::new(CommandLine::from(tokens)),
        }
    }

    pub fn until(mut self, pattern: &str) -> Self {
        self.command.until = Some(pattern.to_string());
        self
    }

    pub fn flags(mut self, flags: &str) -> Self {
        self.command.flags = Some(flags.to_string());
        self
    }

    pub fn shell(mut self, val: bool) -> Self {
        self.command.shell = Some(val);
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.command.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> CommandConfig {
        self.command
    }
}
