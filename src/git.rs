// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Background git branch/dirty queries for the status bar.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::process::Command;
use tokio::sync::mpsc;

const GIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Result of one refresh. `None` fields mean the query failed or timed out;
/// the displayed value should be left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitUpdate {
    pub(crate) generation: u64,
    pub(crate) branch: Option<String>,
    pub(crate) dirty: Option<bool>,
}

async fn run_git(cwd: &Path, args: &[&str]) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(GIT_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(output)) => {
            debug!("git {} exited with {}", args.join(" "), output.status);
            None
        }
        Ok(Err(e)) => {
            debug!("Failed to run git {}: {}", args.join(" "), e);
            None
        }
        Err(_) => {
            warn!("git {} timed out after {:?}", args.join(" "), GIT_TIMEOUT);
            None
        }
    }
}

pub(crate) async fn query_branch(cwd: &Path) -> Option<String> {
    let output = run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    let branch = output.trim();
    (!branch.is_empty()).then(|| branch.to_string())
}

pub(crate) async fn query_dirty(cwd: &Path) -> Option<bool> {
    let output = run_git(cwd, &["status", "--porcelain"]).await?;
    Some(!output.trim().is_empty())
}

/// Spawns git queries and hands back only the newest result.
pub(crate) struct GitWatcher {
    cwd: PathBuf,
    generation: u64,
    tx: mpsc::UnboundedSender<GitUpdate>,
    rx: mpsc::UnboundedReceiver<GitUpdate>,
}

impl GitWatcher {
    pub(crate) fn new(cwd: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cwd,
            generation: 0,
            tx,
            rx,
        }
    }

    /// Start a new query. Any refresh still in flight becomes stale.
    pub(crate) fn refresh(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let cwd = self.cwd.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (branch, dirty) = tokio::join!(query_branch(&cwd), query_dirty(&cwd));
            let _ = tx.send(GitUpdate {
                generation,
                branch,
                dirty,
            });
        });
    }

    /// Newest non-stale update received since the last poll.
    pub(crate) fn poll(&mut self) -> Option<GitUpdate> {
        let mut latest = None;
        while let Ok(update) = self.rx.try_recv() {
            if self.accept_update(&update) {
                latest = Some(update);
            } else {
                debug!(
                    "Discarding stale git update {} (current {})",
                    update.generation, self.generation
                );
            }
        }
        latest
    }

    fn accept_update(&self, update: &GitUpdate) -> bool {
        update.generation == self.generation
    }
}
