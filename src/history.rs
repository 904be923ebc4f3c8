// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Persistent prompt history with up/down navigation.
//!
//! Entries are stored as JSON Lines, one record per submitted prompt. The file
//! is only ever appended to; records that fail to parse are skipped on load.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryRecord {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

/// Position while browsing history.
#[derive(Debug, Clone)]
struct Navigation {
    index: usize,
    draft: String,
}

pub(crate) struct HistoryManager {
    entries: Vec<String>,
    path: PathBuf,
    navigation: Option<Navigation>,
    /// The file ends without a newline (torn final write).
    needs_separator: bool,
}

impl HistoryManager {
    /// Load history from `path`. A missing or unreadable file starts empty.
    pub(crate) fn load(path: PathBuf) -> Self {
        let (entries, needs_separator) = Self::load_from_file(&path);
        debug!(
            "Loaded {} history entries from {}",
            entries.len(),
            path.display()
        );
        Self {
            entries,
            path,
            navigation: None,
            needs_separator,
        }
    }

    fn load_from_file(path: &Path) -> (Vec<String>, bool) {
        let Ok(file) = File::open(path) else {
            return (Vec::new(), false);
        };

        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut buf = Vec::new();
        let mut ends_with_newline = true;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Stopped reading history at {}: {}", path.display(), e);
                    break;
                }
            }
            ends_with_newline = buf.last() == Some(&b'\n');

            let Ok(line) = std::str::from_utf8(&buf) else {
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(line) {
                Ok(record) if !record.text.trim().is_empty() => entries.push(record.text),
                Ok(_) => {}
                Err(e) => debug!("Skipping malformed history record: {}", e),
            }
        }

        (entries, !ends_with_newline)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry. Blank entries are ignored; consecutive duplicates are kept.
    pub(crate) fn add(&mut self, entry: &str) {
        self.navigation = None;
        if entry.trim().is_empty() {
            return;
        }

        self.entries.push(entry.to_string());
        if let Err(e) = self.append_to_file(entry) {
            warn!("Failed to write history to {}: {}", self.path.display(), e);
        }
    }

    fn append_to_file(&mut self, entry: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = HistoryRecord {
            text: entry.to_string(),
            timestamp: Some(Utc::now()),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        if self.needs_separator || Self::file_lacks_trailing_newline(&self.path) {
            line.insert(0, '\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write per record so a crash can only tear the final line.
        file.write_all(line.as_bytes())?;
        file.flush()?;
        self.needs_separator = false;
        Ok(())
    }

    /// True when the file exists, is non-empty and its last byte is not `\n`.
    fn file_lacks_trailing_newline(path: &Path) -> bool {
        let Ok(mut file) = File::open(path) else {
            return false;
        };
        if file.seek(SeekFrom::End(-1)).is_err() {
            return false;
        }
        let mut last = [0u8; 1];
        matches!(file.read(&mut last), Ok(1) if last[0] != b'\n')
    }

    /// Step back through history.
    ///
    /// The first call saves `current_text` as the draft and returns the newest
    /// entry. Returns `None` at the oldest entry or when history is empty.
    pub(crate) fn get_previous(&mut self, current_text: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let Some(nav) = self.navigation.as_mut() else {
            let index = self.entries.len() - 1;
            self.navigation = Some(Navigation {
                index,
                draft: current_text.to_string(),
            });
            return self.entries.get(index).cloned();
        };

        if nav.index == 0 {
            return None;
        }
        nav.index -= 1;
        self.entries.get(nav.index).cloned()
    }

    /// Step forward through history; past the newest entry the draft is
    /// restored and navigation ends.
    pub(crate) fn get_next(&mut self) -> Option<String> {
        let nav = self.navigation.as_mut()?;
        if nav.index + 1 >= self.entries.len() {
            let draft = std::mem::take(&mut nav.draft);
            self.navigation = None;
            return Some(draft);
        }
        nav.index += 1;
        self.entries.get(nav.index).cloned()
    }

    #[cfg(test)]
    pub(crate) fn is_navigating(&self) -> bool {
        self.navigation.is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[String] {
        &self.entries
    }
}
