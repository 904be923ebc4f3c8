// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! User configuration loaded from `~/.coda/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use dirs::home_dir;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_DIR: &str = ".coda";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_FILE: &str = "history.jsonl";
const LOG_FILE: &str = "coda.log";

/// Settings read from the config file. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct ConfigFile {
    /// Where submitted prompts are persisted.
    pub(crate) history_file: Option<PathBuf>,
    /// Start with tool auto-approval enabled.
    pub(crate) auto_approve: bool,
    /// Query git for branch/dirty state in the status bar.
    pub(crate) git_status: bool,
    pub(crate) log_file: Option<PathBuf>,
    /// One of "off", "error", "warn", "info", "debug", "trace".
    pub(crate) log_level: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            history_file: None,
            auto_approve: false,
            git_status: true,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl ConfigFile {
    /// Base directory for coda state (`~/.coda`).
    pub(crate) fn config_dir() -> PathBuf {
        home_dir()
            .map(|home| home.join(CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
    }

    pub(crate) fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    /// Load the config file. A missing file yields the defaults.
    pub(crate) fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(content)?;
        if config.level_filter().is_none() {
            return Err(Error::Config(format!(
                "unknown log_level '{}'",
                config.log_level
            )));
        }
        Ok(config)
    }

    /// History file location, falling back to `~/.coda/history.jsonl`.
    pub(crate) fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(HISTORY_FILE))
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(LOG_FILE))
    }

    pub(crate) fn level_filter(&self) -> Option<log::LevelFilter> {
        self.log_level.parse().ok()
    }
}
