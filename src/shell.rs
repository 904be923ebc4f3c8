// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Runs `!` commands typed at the prompt.
//!
//! Output is stdout followed by stderr, trimmed to the last
//! `MAX_OUTPUT_LINES` lines so a noisy command cannot flood the transcript.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_OUTPUT_LINES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShellOutput {
    pub(crate) command: String,
    pub(crate) output: String,
    /// `None` when the command could not be run or was killed.
    pub(crate) exit_code: Option<i32>,
}

impl ShellOutput {
    pub(crate) fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Keep the last `MAX_OUTPUT_LINES` lines, with a notice when lines were dropped.
fn truncate_tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= MAX_OUTPUT_LINES {
        return text.trim_end().to_string();
    }
    let dropped = lines.len() - MAX_OUTPUT_LINES;
    format!(
        "[{dropped} earlier lines truncated]\n{}",
        lines[dropped..].join("\n")
    )
}

pub(crate) async fn run(command: &str, cwd: &Path) -> ShellOutput {
    run_with_timeout(command, cwd, DEFAULT_TIMEOUT).await
}

async fn run_with_timeout(command: &str, cwd: &Path, timeout: Duration) -> ShellOutput {
    debug!("Running shell command: {}", command);

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let (output, exit_code) = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.is_empty() {
                if !combined.is_empty() && !combined.ends_with('\n') {
                    combined.push('\n');
                }
                combined.push_str(&stderr);
            }
            (truncate_tail(&combined), output.status.code())
        }
        Ok(Err(e)) => {
            warn!("Failed to spawn shell command: {}", e);
            (format!("Failed to spawn command: {e}"), None)
        }
        Err(_) => (
            format!("Command timed out after {}s", timeout.as_secs()),
            None,
        ),
    };

    ShellOutput {
        command: command.to_string(),
        output,
        exit_code,
    }
}
