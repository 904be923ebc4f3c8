// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Fuzzy `@path` completion against the working directory.
//!
//! The tree walk is bounded by depth and entry count and its result is cached
//! briefly, so a keystroke never waits on an exhaustive scan of a large tree.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use super::{CompletionContext, CompletionController, ReplacementSpan, Suggestion};

/// Maximum number of suggestions returned.
pub(crate) const MAX_RESULTS: usize = 20;
const MAX_DEPTH: usize = 6;
const MAX_ENTRIES: usize = 5_000;
const CACHE_TTL: Duration = Duration::from_secs(5);

/// Directories never descended into (hidden ones are skipped separately).
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "__pycache__"];

#[derive(Debug, Clone)]
struct Candidate {
    /// Relative path with `/` separators; directories end in `/`.
    label: String,
    is_dir: bool,
}

pub(crate) struct FuzzyFileController {
    root: PathBuf,
    cache: Option<(Instant, Vec<Candidate>)>,
}

impl FuzzyFileController {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root, cache: None }
    }

    fn candidates(&mut self) -> &[Candidate] {
        let stale = self
            .cache
            .as_ref()
            .is_none_or(|(scanned_at, _)| scanned_at.elapsed() > CACHE_TTL);
        if stale {
            let started = Instant::now();
            let candidates = scan(&self.root);
            debug!(
                "Scanned {} paths under {} in {:?}",
                candidates.len(),
                self.root.display(),
                started.elapsed()
            );
            self.cache = Some((Instant::now(), candidates));
        }
        self.cache
            .as_ref()
            .map(|(_, candidates)| candidates.as_slice())
            .unwrap_or_default()
    }

    /// The token at the cursor if it starts with `@`: (token start, query).
    fn query<'a>(ctx: &CompletionContext<'a>) -> Option<(usize, &'a str)> {
        let start = ctx.token_start();
        let token = ctx.slice(start, ctx.cursor);
        token.strip_prefix('@').map(|query| (start, query))
    }
}

impl CompletionController for FuzzyFileController {
    fn name(&self) -> &'static str {
        "file"
    }

    fn claims(&self, ctx: &CompletionContext) -> bool {
        Self::query(ctx).is_some()
    }

    fn suggest(&mut self, ctx: &CompletionContext) -> Vec<Suggestion> {
        let Some((_, query)) = Self::query(ctx) else {
            return Vec::new();
        };
        let query: Vec<char> = query.to_lowercase().chars().collect();

        let mut ranked: Vec<(usize, &Candidate)> = self
            .candidates()
            .iter()
            .filter_map(|candidate| {
                match_quality(&query, &candidate.label).map(|quality| (quality, candidate))
            })
            .collect();

        ranked.sort_by(|(qa, a), (qb, b)| {
            qb.cmp(qa)
                .then_with(|| a.label.len().cmp(&b.label.len()))
                .then_with(|| a.label.cmp(&b.label))
        });

        ranked
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, candidate)| {
                let description = if candidate.is_dir { "directory" } else { "" };
                Suggestion::new(candidate.label.clone(), description)
            })
            .collect()
    }

    fn accept(&self, ctx: &CompletionContext, suggestion: &Suggestion) -> Option<ReplacementSpan> {
        let (start, _) = Self::query(ctx)?;
        Some(ReplacementSpan {
            start,
            end: ctx.token_end(start),
            replacement: suggestion.label.clone(),
        })
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&&*name))
}

/// Unsorted, so the walk streams and `MAX_ENTRIES` bounds the work.
/// `suggest` does the ordering.
fn scan(root: &Path) -> Vec<Candidate> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(MAX_DEPTH)
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry))
        .filter_map(|entry| entry.ok())
        .take(MAX_ENTRIES)
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let mut label = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let is_dir = entry.file_type().is_dir();
            if is_dir {
                label.push('/');
            }
            Some(Candidate { label, is_dir })
        })
        .collect()
}

/// Score `path` against a lowercase `query`.
///
/// Returns `None` unless the query is a (case-insensitive) subsequence of the
/// path. Otherwise the score is the length of the longest run of consecutive
/// query characters found contiguously in the path.
fn match_quality(query: &[char], path: &str) -> Option<usize> {
    let path: Vec<char> = path.to_lowercase().chars().collect();

    let mut remaining = query.iter().peekable();
    for c in &path {
        if remaining.peek() == Some(&c) {
            remaining.next();
        }
    }
    if remaining.peek().is_some() {
        return None;
    }

    // Longest common substring, one row at a time.
    let mut best = 0;
    let mut prev = vec![0usize; path.len() + 1];
    for q in query {
        let mut row = vec![0usize; path.len() + 1];
        for (j, p) in path.iter().enumerate() {
            if q == p {
                row[j + 1] = prev[j] + 1;
                best = best.max(row[j + 1]);
            }
        }
        prev = row;
    }
    Some(best)
}
