// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use ratatui::{
    prelude::*,
    widgets::{Block, Clear, Paragraph},
};

use crate::completion::{CompletionView, Suggestion};

pub(crate) const POPUP_MAX_VISIBLE: usize = 10;

/// Suggestion list shown under the input while completion is active.
#[derive(Debug, Default)]
pub(crate) struct CompletionPopup {
    items: Vec<Suggestion>,
    selected: usize,
}

impl CompletionView for CompletionPopup {
    fn render_suggestions(&mut self, suggestions: &[Suggestion], selected: usize) {
        self.items = suggestions.to_vec();
        self.selected = selected.min(self.items.len().saturating_sub(1));
    }

    fn hide(&mut self) {
        self.items.clear();
        self.selected = 0;
    }
}

impl CompletionPopup {
    pub(crate) fn is_visible(&self) -> bool {
        !self.items.is_empty()
    }

    /// Rows needed to draw the popup.
    pub(crate) fn height(&self) -> u16 {
        self.items.len().min(POPUP_MAX_VISIBLE) as u16
    }

    /// First visible row, keeping the selection on screen.
    fn scroll_start(&self) -> usize {
        let total = self.items.len();
        let max_start = total.saturating_sub(POPUP_MAX_VISIBLE);
        self.selected
            .saturating_sub(POPUP_MAX_VISIBLE - 1)
            .min(max_start)
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect) {
        if !self.is_visible() || area.height == 0 {
            return;
        }

        let bg = Color::Rgb(24, 24, 24);
        let start = self.scroll_start();
        let end = (start + POPUP_MAX_VISIBLE).min(self.items.len());
        let label_width = self.items[start..end]
            .iter()
            .map(|s| s.label.chars().count())
            .max()
            .unwrap_or(0);

        let lines: Vec<Line> = self.items[start..end]
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let is_selected = start + i == self.selected;
                let label = format!(" {:<width$}  ", item.label, width = label_width);
                let (label_style, desc_style) = if is_selected {
                    (
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
                    )
                } else {
                    (
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                        Style::default().fg(Color::DarkGray),
                    )
                };
                Line::from(vec![
                    Span::styled(label, label_style),
                    Span::styled(item.description.clone(), desc_style),
                ])
            })
            .collect();

        frame.render_widget(Clear, area);
        let widget = Paragraph::new(lines).block(Block::default().style(Style::default().bg(bg)));
        frame.render_widget(widget, area);
    }

    #[cfg(test)]
    fn visible_labels(&self) -> Vec<&str> {
        let start = self.scroll_start();
        let end = (start + POPUP_MAX_VISIBLE).min(self.items.len());
        self.items[start..end]
            .iter()
            .map(|s| s.label.as_str())
            .collect()
    }
}
