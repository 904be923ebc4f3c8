// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Line wrapping and cursor placement shared by the input and transcript.

use unicode_width::UnicodeWidthChar;

use super::editor::Position;

/// Number of spaces to display for a tab character.
pub(crate) const TAB_WIDTH: usize = 4;

#[inline]
pub(crate) fn char_display_width(ch: char) -> usize {
    if ch == '\t' {
        TAB_WIDTH
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(0)
    }
}

/// Usable columns for `width`, leaving one column of margin at the edge so a
/// cursor after the last character still fits.
fn effective_width(width: u16) -> usize {
    (width as usize).saturating_sub(1).max(1)
}

/// Split one logical line into display rows no wider than the effective width.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut col = 0;

    for ch in line.chars() {
        let ch_width = char_display_width(ch);
        if col > 0 && col + ch_width > width {
            rows.push(std::mem::take(&mut current));
            col = 0;
        }
        if ch == '\t' {
            current.push_str(&" ".repeat(TAB_WIDTH));
        } else {
            current.push(ch);
        }
        col += ch_width;
    }
    rows.push(current);
    rows
}

/// Wrap `text` (which may contain newlines) into display rows.
pub(crate) fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = effective_width(width);
    text.split('\n')
        .flat_map(|line| wrap_line(line, width))
        .collect()
}

/// Display rows needed for the editor lines at `width`.
pub(crate) fn input_display_lines(lines: &[String], width: u16) -> usize {
    let width = effective_width(width);
    lines
        .iter()
        .map(|line| wrap_line(line, width).len())
        .sum::<usize>()
        .max(1)
}

/// Display (row, column) of the editor cursor once lines are wrapped.
pub(crate) fn cursor_position(lines: &[String], cursor: Position, width: u16) -> (usize, u16) {
    let width = effective_width(width);
    let mut row: usize = lines
        .iter()
        .take(cursor.row)
        .map(|line| wrap_line(line, width).len())
        .sum();

    let mut col = 0;
    if let Some(line) = lines.get(cursor.row) {
        for ch in line.chars().take(cursor.col) {
            let ch_width = char_display_width(ch);
            if col > 0 && col + ch_width > width {
                row += 1;
                col = 0;
            }
            col += ch_width;
        }
    }

    (row, col.min(u16::MAX as usize) as u16)
}
