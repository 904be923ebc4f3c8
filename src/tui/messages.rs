// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use ratatui::{prelude::*, widgets::Paragraph};

use super::chat_input::{BASH_COLOR, COMMAND_COLOR, InputMode};
use super::layout::wrap_text;
use crate::shell::ShellOutput;

pub(crate) enum Message {
    Banner(String),
    Text(String),
    Error(String),
    User(UserMessage),
    Shell(ShellMessage),
}

pub(crate) struct UserMessage {
    pub text: String,
    pub mode: InputMode,
}

pub(crate) struct ShellMessage {
    pub command: String,
    pub output: String,
    pub status: Option<i32>,
    pub running: bool,
}

impl ShellMessage {
    pub(crate) fn running(command: &str) -> Self {
        Self {
            command: command.to_string(),
            output: String::new(),
            status: None,
            running: true,
        }
    }

    pub(crate) fn finish(&mut self, result: ShellOutput) {
        self.output = result.output;
        self.status = result.exit_code;
        self.running = false;
    }
}

/// Format shell command output for display
pub(crate) fn format_shell_display(
    command: &str,
    output: &str,
    status: Option<i32>,
    running: bool,
) -> String {
    let mut display = format!("! {command}");
    for line in output.lines() {
        display.push_str("\n  ");
        display.push_str(line);
    }
    if running {
        display.push_str("\n  ...");
    } else {
        match status {
            Some(0) => {}
            Some(code) => display.push_str(&format!("\n  [exit {code}]")),
            None => display.push_str("\n  [killed]"),
        }
    }
    display
}

impl Message {
    pub(crate) fn display_text(&self) -> String {
        match self {
            Message::Banner(text) | Message::Text(text) => text.clone(),
            Message::Error(text) => format!("Error: {text}"),
            Message::User(user) => {
                let prompt = if user.mode == InputMode::Bash { "" } else { "> " };
                format!("{prompt}{}", user.text)
            }
            Message::Shell(shell) => {
                format_shell_display(&shell.command, &shell.output, shell.status, shell.running)
            }
        }
    }

    fn style(&self) -> Style {
        match self {
            Message::Banner(_) => Style::default().fg(Color::Cyan),
            Message::Text(_) => Style::default().fg(Color::Rgb(150, 150, 150)),
            Message::Error(_) => Style::default().fg(Color::Red),
            Message::User(user) => {
                let fg = match user.mode {
                    InputMode::Normal => Color::White,
                    InputMode::Bash => BASH_COLOR,
                    InputMode::Command => COMMAND_COLOR,
                };
                Style::default().fg(fg).add_modifier(Modifier::BOLD)
            }
            Message::Shell(_) => Style::default().fg(Color::Rgb(200, 200, 200)),
        }
    }
}

/// Scrollback of everything shown above the input.
#[derive(Default)]
pub(crate) struct Transcript {
    messages: Vec<Message>,
    /// Rows scrolled up from the bottom.
    scroll: usize,
    /// Largest valid `scroll` as of the last render.
    max_scroll: usize,
}

impl Transcript {
    /// Append a message and return its index.
    pub(crate) fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.scroll = 0;
        self.messages.len() - 1
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
        self.scroll = 0;
        self.max_scroll = 0;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub(crate) fn texts(&self) -> Vec<String> {
        self.messages.iter().map(Message::display_text).collect()
    }

    /// Rough token count: four characters per token.
    pub(crate) fn estimate_tokens(&self) -> usize {
        self.messages
            .iter()
            .map(|m| m.display_text().chars().count())
            .sum::<usize>()
            / 4
    }

    pub(crate) fn scroll_up(&mut self, rows: usize) {
        self.scroll = (self.scroll + rows).min(self.max_scroll);
    }

    pub(crate) fn scroll_down(&mut self, rows: usize) {
        self.scroll = self.scroll.saturating_sub(rows);
    }

    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            let style = message.style();
            lines.extend(
                wrap_text(&message.display_text(), width)
                    .into_iter()
                    .map(|row| Line::styled(row, style)),
            );
        }
        lines
    }

    pub(crate) fn render(&mut self, frame: &mut Frame, area: Rect) {
        let lines = self.lines(area.width);
        let height = area.height as usize;
        self.max_scroll = lines.len().saturating_sub(height);
        self.scroll = self.scroll.min(self.max_scroll);

        let end = lines.len() - self.scroll;
        let start = end.saturating_sub(height);
        let visible: Vec<Line> = lines[start..end].to_vec();
        frame.render_widget(Paragraph::new(visible), area);
    }
}
