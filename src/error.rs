// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns a concise message suitable for a transcript notice.
    pub(crate) fn tui_message(&self) -> String {
        match self {
            Error::Io(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
