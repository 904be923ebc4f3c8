// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Autocompletion for the chat input.
//!
//! A [`CompletionManager`] holds an ordered list of controllers. On every text
//! change the first controller that claims the context becomes active and
//! publishes its suggestions. Offsets are measured in characters, not bytes.

mod files;
mod slash;

pub(crate) use files::FuzzyFileController;
pub(crate) use slash::SlashCommandController;

use crossterm::event::{KeyCode, KeyEvent};
use log::debug;

/// A single completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Suggestion {
    pub(crate) label: String,
    pub(crate) description: String,
}

impl Suggestion {
    pub(crate) fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Text and cursor position a controller inspects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompletionContext<'a> {
    pub(crate) text: &'a str,
    /// Cursor position in characters from the start of `text`.
    pub(crate) cursor: usize,
}

impl<'a> CompletionContext<'a> {
    pub(crate) fn new(text: &'a str, cursor: usize) -> Self {
        let cursor = cursor.min(text.chars().count());
        Self { text, cursor }
    }

    /// Text before the cursor.
    pub(crate) fn before_cursor(&self) -> &'a str {
        &self.text[..byte_index(self.text, self.cursor)]
    }

    /// Character offset where the whitespace-delimited token ending at the
    /// cursor begins.
    pub(crate) fn token_start(&self) -> usize {
        let before: Vec<char> = self.before_cursor().chars().collect();
        before
            .iter()
            .rposition(|c| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Character offset of the first whitespace at or after `from`, or the end.
    pub(crate) fn token_end(&self, from: usize) -> usize {
        self.text
            .chars()
            .enumerate()
            .skip(from)
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or_else(|| self.text.chars().count())
    }

    /// Characters in `start..end`.
    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a str {
        let start = byte_index(self.text, start);
        let end = byte_index(self.text, end).max(start);
        &self.text[start..end]
    }
}

/// Byte index of the `offset`-th character, saturating at the end of `text`.
pub(crate) fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// How an accepted suggestion rewrites the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReplacementSpan {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) replacement: String,
}

/// A source of suggestions triggered by a character near the cursor.
pub(crate) trait CompletionController {
    fn name(&self) -> &'static str;

    /// Whether this controller owns the context (its trigger is present).
    fn claims(&self, ctx: &CompletionContext) -> bool;

    fn suggest(&mut self, ctx: &CompletionContext) -> Vec<Suggestion>;

    /// The buffer edit that applies `suggestion`.
    fn accept(&self, ctx: &CompletionContext, suggestion: &Suggestion) -> Option<ReplacementSpan>;
}

/// Result of offering a key to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompletionResult {
    /// Not consumed; the caller processes the key normally.
    Ignored,
    /// Consumed (selection moved).
    Handled,
    /// Consumed; the caller must splice the span into the buffer.
    Accepted(ReplacementSpan),
}

impl CompletionResult {
    #[cfg(test)]
    pub(crate) fn is_handled(&self) -> bool {
        !matches!(self, CompletionResult::Ignored)
    }
}

/// Display collaborator for the suggestion list.
pub(crate) trait CompletionView {
    fn render_suggestions(&mut self, suggestions: &[Suggestion], selected: usize);
    fn hide(&mut self);
}

pub(crate) struct CompletionManager {
    controllers: Vec<Box<dyn CompletionController>>,
    active: Option<usize>,
    suggestions: Vec<Suggestion>,
    selected: usize,
}

impl CompletionManager {
    /// Controllers are queried in the given order; earlier ones win.
    pub(crate) fn new(controllers: Vec<Box<dyn CompletionController>>) -> Self {
        Self {
            controllers,
            active: None,
            suggestions: Vec::new(),
            selected: 0,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[cfg(test)]
    pub(crate) fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    #[cfg(test)]
    pub(crate) fn selected(&self) -> usize {
        self.selected
    }

    pub(crate) fn on_text_changed(&mut self, text: &str, cursor: usize) {
        let ctx = CompletionContext::new(text, cursor);
        self.suggestions.clear();
        self.selected = 0;
        self.active = None;

        let Some(index) = self.controllers.iter().position(|c| c.claims(&ctx)) else {
            return;
        };

        let controller = &mut self.controllers[index];
        let suggestions = controller.suggest(&ctx);
        debug!(
            "{} completion: {} suggestions",
            controller.name(),
            suggestions.len()
        );
        if !suggestions.is_empty() {
            self.suggestions = suggestions;
            self.active = Some(index);
        }
    }

    pub(crate) fn on_key(&mut self, key: &KeyEvent, text: &str, cursor: usize) -> CompletionResult {
        let Some(index) = self.active else {
            return CompletionResult::Ignored;
        };

        match key.code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                CompletionResult::Handled
            }
            KeyCode::Down => {
                self.selected = (self.selected + 1).min(self.suggestions.len().saturating_sub(1));
                CompletionResult::Handled
            }
            KeyCode::Tab | KeyCode::Enter => {
                let ctx = CompletionContext::new(text, cursor);
                let span = self
                    .suggestions
                    .get(self.selected)
                    .and_then(|suggestion| self.controllers[index].accept(&ctx, suggestion));
                self.reset();
                match span {
                    Some(span) => CompletionResult::Accepted(span),
                    None => CompletionResult::Handled,
                }
            }
            _ => {
                self.reset();
                CompletionResult::Ignored
            }
        }
    }

    /// Force the inactive state.
    pub(crate) fn reset(&mut self) {
        self.active = None;
        self.suggestions.clear();
        self.selected = 0;
    }

    /// Push the current state to a view.
    pub(crate) fn render(&self, view: &mut dyn CompletionView) {
        if self.suggestions.is_empty() {
            view.hide();
        } else {
            view.render_suggestions(&self.suggestions, self.selected);
        }
    }
}
