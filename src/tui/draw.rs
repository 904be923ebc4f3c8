// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use ratatui::{
    prelude::*,
    widgets::{Block, Borders},
};

use super::app::App;

const MIN_MESSAGE_HEIGHT: u16 = 1;

pub(super) fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    let input_rows = app.input.height(size.width);
    let input_height = input_rows
        .saturating_add(2) // +2 for border lines
        .min(size.height.saturating_sub(MIN_MESSAGE_HEIGHT + 1).max(3));
    let popup_height = app.input.popup().height();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MIN_MESSAGE_HEIGHT),
            Constraint::Length(input_height),
            Constraint::Length(popup_height),
            Constraint::Length(1),
        ])
        .split(size);

    app.transcript.render(frame, chunks[0]);
    render_input_area(frame, chunks[1], app);
    app.input.popup().render(frame, chunks[2]);
    app.status.render(frame, chunks[3]);
}

fn render_input_area(frame: &mut Frame, area: Rect, app: &App) {
    let border_fg = if app.input.is_disabled() {
        Color::Rgb(40, 40, 40)
    } else {
        Color::Rgb(60, 60, 60)
    };
    let block = Block::default()
        .borders(Borders::TOP | Borders::BOTTOM)
        .border_style(Style::default().fg(border_fg));
    let text_area = block.inner(area);
    frame.render_widget(block, area);
    app.input.render(frame, text_area);
}
