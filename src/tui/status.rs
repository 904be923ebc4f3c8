// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use std::path::Path;

use ratatui::{prelude::*, widgets::Paragraph};

use super::chat_input::{BASH_COLOR, COMMAND_COLOR, InputMode};

const APPROVAL_AUTO_COLOR: Color = Color::Rgb(80, 250, 123);
const APPROVAL_MANUAL_COLOR: Color = Color::Rgb(255, 184, 108);
const MUTED: Color = Color::Rgb(150, 150, 150);

/// Colour class of a git branch name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BranchKind {
    Main,
    Feature,
    Develop,
    Other,
}

impl BranchKind {
    pub(crate) fn from_name(branch: &str) -> Self {
        match branch.to_lowercase().as_str() {
            "main" | "master" => BranchKind::Main,
            "develop" => BranchKind::Develop,
            b if b.starts_with("feature/") || b.starts_with("feat/") => BranchKind::Feature,
            b if b.starts_with("dev/") => BranchKind::Develop,
            _ => BranchKind::Other,
        }
    }

    fn color(self) -> Color {
        match self {
            BranchKind::Main => Color::Green,
            BranchKind::Feature => Color::Cyan,
            BranchKind::Develop => Color::Yellow,
            BranchKind::Other => Color::Magenta,
        }
    }
}

/// Token counts as shown in the status bar. Zero is not shown.
pub(crate) fn format_tokens(tokens: usize) -> Option<String> {
    match tokens {
        0 => None,
        1..1000 => Some(format!("{tokens} tokens")),
        _ => Some(format!("{:.1}K tokens", tokens as f64 / 1000.0)),
    }
}

/// Shorten `path` with "~" for the home directory.
pub(crate) fn format_cwd(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home
        && let Ok(relative) = path.strip_prefix(home)
    {
        if relative.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", relative.display());
    }
    path.display().to_string()
}

#[derive(Debug, Default)]
pub(crate) struct StatusBar {
    pub(crate) mode: InputMode,
    pub(crate) auto_approve: bool,
    pub(crate) message: Option<String>,
    pub(crate) tokens: usize,
    pub(crate) branch: Option<String>,
    pub(crate) dirty: bool,
}

impl StatusBar {
    fn message_is_busy(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("thinking") || lower.contains("executing")
    }

    pub(crate) fn left_spans(&self) -> Vec<Span<'static>> {
        let mut spans = Vec::new();

        let mode = match self.mode {
            InputMode::Normal => None,
            InputMode::Bash => Some(("BASH", BASH_COLOR)),
            InputMode::Command => Some(("CMD", COMMAND_COLOR)),
        };
        if let Some((label, color)) = mode {
            spans.push(Span::styled(
                format!(" {label} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(color)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
        }

        let (approval, color) = if self.auto_approve {
            ("auto", APPROVAL_AUTO_COLOR)
        } else {
            ("manual", APPROVAL_MANUAL_COLOR)
        };
        spans.push(Span::styled(approval, Style::default().fg(color)));
        spans.push(Span::styled(
            " | shift+tab to cycle",
            Style::default().fg(Color::DarkGray),
        ));

        if let Some(message) = &self.message {
            let style = if Self::message_is_busy(message) {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(MUTED)
            };
            spans.push(Span::raw("  "));
            spans.push(Span::styled(message.clone(), style));
        }
        spans
    }

    pub(crate) fn right_spans(&self) -> Vec<Span<'static>> {
        let mut spans = Vec::new();
        if let Some(tokens) = format_tokens(self.tokens) {
            spans.push(Span::styled(tokens, Style::default().fg(MUTED)));
        }
        if let Some(branch) = &self.branch {
            if !spans.is_empty() {
                spans.push(Span::styled(" • ", Style::default().fg(Color::DarkGray)));
            }
            let dirty = if self.dirty { "*" } else { "" };
            spans.push(Span::styled(
                format!("git:{branch}{dirty}"),
                Style::default().fg(BranchKind::from_name(branch).color()),
            ));
        }
        spans.push(Span::raw(" "));
        spans
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Paragraph::new(Line::from(self.left_spans())).alignment(Alignment::Left),
            area,
        );
        frame.render_widget(
            Paragraph::new(Line::from(self.right_spans())).alignment(Alignment::Right),
            area,
        );
    }
}
