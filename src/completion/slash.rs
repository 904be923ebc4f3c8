// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Slash command completion.

use super::{CompletionContext, CompletionController, ReplacementSpan, Suggestion};

/// Completes `/command` names from a fixed registry.
pub(crate) struct SlashCommandController {
    /// (name without the slash, description), in display order.
    commands: Vec<(String, String)>,
}

impl SlashCommandController {
    pub(crate) fn new(commands: Vec<(String, String)>) -> Self {
        Self { commands }
    }

    /// The partially typed command name, without the slash.
    fn query<'a>(ctx: &CompletionContext<'a>) -> Option<&'a str> {
        ctx.before_cursor().strip_prefix('/')
    }
}

impl CompletionController for SlashCommandController {
    fn name(&self) -> &'static str {
        "slash"
    }

    fn claims(&self, ctx: &CompletionContext) -> bool {
        // Once arguments are being typed the menu steps aside.
        Self::query(ctx).is_some_and(|query| !query.contains(char::is_whitespace))
    }

    fn suggest(&mut self, ctx: &CompletionContext) -> Vec<Suggestion> {
        let Some(query) = Self::query(ctx) else {
            return Vec::new();
        };
        let query = query.to_lowercase();

        self.commands
            .iter()
            .filter(|(name, _)| name.to_lowercase().starts_with(&query))
            .map(|(name, description)| Suggestion::new(format!("/{name}"), description.clone()))
            .collect()
    }

    fn accept(&self, ctx: &CompletionContext, suggestion: &Suggestion) -> Option<ReplacementSpan> {
        if !ctx.text.starts_with('/') {
            return None;
        }
        Some(ReplacementSpan {
            start: 0,
            end: ctx.token_end(0),
            replacement: suggestion.label.clone(),
        })
    }
}
