// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Multi-line text buffer with Emacs-style editing for the chat input.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::completion::byte_index;

const UNDO_LIMIT: usize = 100;

/// A (row, column) position. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub(crate) struct Position {
    pub(crate) row: usize,
    pub(crate) col: usize,
}

impl Position {
    pub(crate) fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Outcome of feeding a key to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditResult {
    /// Not an editing key.
    Ignored,
    /// Consumed without changing the text (movement, or a no-op edit).
    Handled,
    /// The text changed.
    Changed,
}

#[derive(Debug, Clone)]
struct Snapshot {
    lines: Vec<String>,
    cursor: Position,
}

pub(crate) struct TextArea {
    /// Never empty; an empty buffer is a single empty line.
    lines: Vec<String>,
    cursor: Position,
    selection: Option<(Position, Position)>,
    kill_register: String,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextArea {
    pub(crate) fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: Position::default(),
            selection: None,
            kill_register: String::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub(crate) fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn cursor(&self) -> Position {
        self.cursor
    }

    pub(crate) fn selection(&self) -> Option<(Position, Position)> {
        self.selection
    }

    #[cfg(test)]
    pub(crate) fn kill_register(&self) -> &str {
        &self.kill_register
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(|l| char_len(l)).unwrap_or(0)
    }

    fn clamp(&self, pos: Position) -> Position {
        let row = pos.row.min(self.lines.len() - 1);
        Position::new(row, pos.col.min(self.line_len(row)))
    }

    /// Move the cursor, clamped to the buffer. Clears any selection.
    pub(crate) fn move_cursor(&mut self, pos: Position) {
        self.cursor = self.clamp(pos);
        self.selection = None;
    }

    /// Cursor position as a character offset from the start of the buffer,
    /// counting each line break as one character.
    pub(crate) fn cursor_offset(&self) -> usize {
        let before: usize = self.lines[..self.cursor.row]
            .iter()
            .map(|l| char_len(l) + 1)
            .sum();
        before + self.cursor.col
    }

    /// Inverse of [`cursor_offset`](Self::cursor_offset); saturates at the end.
    pub(crate) fn set_cursor_offset(&mut self, offset: usize) {
        let mut remaining = offset;
        for (row, line) in self.lines.iter().enumerate() {
            let len = char_len(line);
            if remaining <= len {
                self.move_cursor(Position::new(row, remaining));
                return;
            }
            remaining -= len + 1;
        }
        let last = self.lines.len() - 1;
        self.move_cursor(Position::new(last, self.line_len(last)));
    }

    fn checkpoint(&mut self) {
        self.undo_stack.push(Snapshot {
            lines: self.lines.clone(),
            cursor: self.cursor,
        });
        if self.undo_stack.len() > UNDO_LIMIT {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Replace the whole buffer. The cursor is clamped to the new text.
    pub(crate) fn set_text(&mut self, text: &str) {
        if text == self.text() {
            return;
        }
        self.checkpoint();
        self.lines = text.split('\n').map(str::to_string).collect();
        self.cursor = self.clamp(self.cursor);
        self.selection = None;
    }

    /// Replace the whole buffer and put the cursor after the last character.
    pub(crate) fn set_text_and_move_to_end(&mut self, text: &str) {
        self.set_text(text);
        let last = self.lines.len() - 1;
        self.move_cursor(Position::new(last, self.line_len(last)));
    }

    pub(crate) fn clear(&mut self) {
        self.set_text("");
        self.move_cursor(Position::default());
    }

    /// Remove the selected range. Returns true if any text was removed.
    fn delete_selection(&mut self) -> bool {
        let Some((a, b)) = self.selection.take() else {
            return false;
        };
        let (start, end) = (a.min(b), a.max(b));
        let (start, end) = (self.clamp(start), self.clamp(end));
        if start == end {
            return false;
        }

        self.checkpoint();
        let head = &self.lines[start.row][..byte_index(&self.lines[start.row], start.col)];
        let tail = &self.lines[end.row][byte_index(&self.lines[end.row], end.col)..];
        let merged = format!("{head}{tail}");
        self.lines.splice(start.row..=end.row, [merged]);
        self.cursor = start;
        true
    }

    /// Insert text at the cursor, replacing the selection if there is one.
    pub(crate) fn insert(&mut self, text: &str) -> bool {
        let removed = self.delete_selection();
        if text.is_empty() {
            return removed;
        }
        if !removed {
            self.checkpoint();
        }

        let Position { row, col } = self.cursor;
        let line = &self.lines[row];
        let split = byte_index(line, col);
        let tail = line[split..].to_string();
        let head = line[..split].to_string();

        let mut pieces: Vec<String> = text.split('\n').map(str::to_string).collect();
        let last_len = pieces.last().map(|p| char_len(p)).unwrap_or(0);
        let new_row = row + pieces.len() - 1;
        let new_col = if pieces.len() == 1 {
            col + last_len
        } else {
            last_len
        };

        pieces[0] = format!("{head}{}", pieces[0]);
        if let Some(last) = pieces.last_mut() {
            last.push_str(&tail);
        }
        self.lines.splice(row..=row, pieces);
        self.cursor = Position::new(new_row, new_col);
        true
    }

    pub(crate) fn insert_newline(&mut self) -> bool {
        self.insert("\n")
    }

    pub(crate) fn move_forward(&mut self) {
        let Position { row, col } = self.cursor;
        if col < self.line_len(row) {
            self.move_cursor(Position::new(row, col + 1));
        } else if row + 1 < self.lines.len() {
            self.move_cursor(Position::new(row + 1, 0));
        } else {
            self.selection = None;
        }
    }

    pub(crate) fn move_backward(&mut self) {
        let Position { row, col } = self.cursor;
        if col > 0 {
            self.move_cursor(Position::new(row, col - 1));
        } else if row > 0 {
            self.move_cursor(Position::new(row - 1, self.line_len(row - 1)));
        } else {
            self.selection = None;
        }
    }

    pub(crate) fn move_to_line_start(&mut self) {
        self.move_cursor(Position::new(self.cursor.row, 0));
    }

    pub(crate) fn move_to_line_end(&mut self) {
        let row = self.cursor.row;
        self.move_cursor(Position::new(row, self.line_len(row)));
    }

    pub(crate) fn move_up(&mut self) {
        let Position { row, col } = self.cursor;
        self.move_cursor(Position::new(row.saturating_sub(1), col));
    }

    pub(crate) fn move_down(&mut self) {
        let Position { row, col } = self.cursor;
        self.move_cursor(Position::new(row + 1, col));
    }

    /// Delete the character under the cursor, joining the next line at a line end.
    pub(crate) fn delete_forward(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let Position { row, col } = self.cursor;
        if col < self.line_len(row) {
            self.checkpoint();
            let line = &mut self.lines[row];
            let start = byte_index(line, col);
            let end = byte_index(line, col + 1);
            line.replace_range(start..end, "");
            true
        } else if row + 1 < self.lines.len() {
            self.checkpoint();
            let next = self.lines.remove(row + 1);
            self.lines[row].push_str(&next);
            true
        } else {
            false
        }
    }

    /// Delete the character before the cursor, merging into the previous line
    /// at column 0.
    pub(crate) fn delete_backward(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let Position { row, col } = self.cursor;
        if col > 0 {
            self.checkpoint();
            let line = &mut self.lines[row];
            let start = byte_index(line, col - 1);
            let end = byte_index(line, col);
            line.replace_range(start..end, "");
            self.cursor = Position::new(row, col - 1);
            true
        } else if row > 0 {
            self.checkpoint();
            let current = self.lines.remove(row);
            let prev_len = self.line_len(row - 1);
            self.lines[row - 1].push_str(&current);
            self.cursor = Position::new(row - 1, prev_len);
            true
        } else {
            false
        }
    }

    /// Cut from the cursor to the end of the line into the kill register.
    pub(crate) fn kill_to_line_end(&mut self) -> bool {
        self.selection = None;
        let Position { row, col } = self.cursor;
        if col >= self.line_len(row) {
            return false;
        }
        self.checkpoint();
        let line = &mut self.lines[row];
        let split = byte_index(line, col);
        self.kill_register = line.split_off(split);
        true
    }

    /// Cut the word before the cursor, plus any non-word characters between
    /// it and the cursor, into the kill register.
    pub(crate) fn kill_previous_word(&mut self) -> bool {
        self.selection = None;
        let Position { row, col } = self.cursor;
        if col == 0 {
            return false;
        }

        let chars: Vec<char> = self.lines[row].chars().collect();
        let mut start = col;
        while start > 0 && !is_word_char(chars[start - 1]) {
            start -= 1;
        }
        while start > 0 && is_word_char(chars[start - 1]) {
            start -= 1;
        }

        self.checkpoint();
        self.kill_register = chars[start..col].iter().collect();
        let remaining: String = chars[..start].iter().chain(&chars[col..]).collect();
        self.lines[row] = remaining;
        self.cursor = Position::new(row, start);
        true
    }

    /// Insert the kill register at the cursor. The register is kept.
    pub(crate) fn yank(&mut self) -> bool {
        if self.kill_register.is_empty() {
            return false;
        }
        let text = self.kill_register.clone();
        self.insert(&text)
    }

    pub(crate) fn select_all(&mut self) {
        if self.is_empty() {
            return;
        }
        let last = self.lines.len() - 1;
        let end = Position::new(last, self.line_len(last));
        self.selection = Some((Position::default(), end));
        self.cursor = end;
    }

    pub(crate) fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(Snapshot {
            lines: std::mem::replace(&mut self.lines, snapshot.lines),
            cursor: self.cursor,
        });
        self.cursor = self.clamp(snapshot.cursor);
        self.selection = None;
        true
    }

    pub(crate) fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(Snapshot {
            lines: std::mem::replace(&mut self.lines, snapshot.lines),
            cursor: self.cursor,
        });
        self.cursor = self.clamp(snapshot.cursor);
        self.selection = None;
        true
    }

    /// Default editing behaviour for a key.
    pub(crate) fn handle_key(&mut self, key: &KeyEvent) -> EditResult {
        let mods = key.modifiers;
        let ctrl = mods.contains(KeyModifiers::CONTROL);
        let alt = mods.contains(KeyModifiers::ALT);
        let sup = mods.contains(KeyModifiers::SUPER);
        let shift = mods.contains(KeyModifiers::SHIFT);

        let edit = |changed: bool| {
            if changed {
                EditResult::Changed
            } else {
                EditResult::Handled
            }
        };
        let moved = |_: ()| EditResult::Handled;

        match key.code {
            KeyCode::Char(c) if sup && c.eq_ignore_ascii_case(&'z') => {
                edit(if shift { self.redo() } else { self.undo() })
            }
            // Ctrl+_ and Ctrl+/ both arrive as Ctrl+7 on legacy terminals.
            KeyCode::Char('_' | '/' | '7') if ctrl => {
                edit(if shift { self.redo() } else { self.undo() })
            }
            KeyCode::Char(c) if ctrl && shift && c.eq_ignore_ascii_case(&'a') => {
                moved(self.select_all())
            }
            KeyCode::Char(c) if ctrl => match c {
                'a' => moved(self.move_to_line_start()),
                'e' => moved(self.move_to_line_end()),
                'f' => moved(self.move_forward()),
                'b' => moved(self.move_backward()),
                'd' => edit(self.delete_forward()),
                'h' => edit(self.delete_backward()),
                'k' => edit(self.kill_to_line_end()),
                'w' => edit(self.kill_previous_word()),
                'y' => edit(self.yank()),
                _ => EditResult::Ignored,
            },
            KeyCode::Char(_) if alt || sup => EditResult::Ignored,
            KeyCode::Char(c) => {
                let mut buf = [0u8; 4];
                edit(self.insert(c.encode_utf8(&mut buf)))
            }
            KeyCode::Backspace if ctrl || alt => edit(self.kill_previous_word()),
            KeyCode::Backspace => edit(self.delete_backward()),
            KeyCode::Delete => edit(self.delete_forward()),
            KeyCode::Left => moved(self.move_backward()),
            KeyCode::Right => moved(self.move_forward()),
            KeyCode::Up => moved(self.move_up()),
            KeyCode::Down => moved(self.move_down()),
            KeyCode::Home => moved(self.move_to_line_start()),
            KeyCode::End => moved(self.move_to_line_end()),
            _ => EditResult::Ignored,
        }
    }
}

impl Default for TextArea {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str, row: usize, col: usize) -> TextArea {
        let mut area = TextArea::new();
        area.set_text(text);
        area.move_cursor(Position::new(row, col));
        area
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_forward_backward_wrap_lines() {
        let mut area = buffer("ab\ncd", 0, 2);
        area.move_forward();
        assert_eq!(area.cursor(), Position::new(1, 0));
        area.move_backward();
        assert_eq!(area.cursor(), Position::new(0, 2));

        // No-ops at the buffer edges.
        area.move_cursor(Position::new(0, 0));
        area.move_backward();
        assert_eq!(area.cursor(), Position::new(0, 0));
        area.move_cursor(Position::new(1, 2));
        area.move_forward();
        assert_eq!(area.cursor(), Position::new(1, 2));
    }

    #[test]
    fn test_line_start_end_stay_on_line() {
        let mut area = buffer("first\nsecond line", 1, 3);
        area.move_to_line_end();
        assert_eq!(area.cursor(), Position::new(1, 11));
        area.move_to_line_start();
        assert_eq!(area.cursor(), Position::new(1, 0));
    }

    #[test]
    fn test_up_down_clamp_column() {
        let mut area = buffer("a\nlonger", 1, 5);
        area.move_up();
        assert_eq!(area.cursor(), Position::new(0, 1));
        area.move_up();
        assert_eq!(area.cursor(), Position::new(0, 1));
        area.move_down();
        assert_eq!(area.cursor(), Position::new(1, 1));
    }

    #[test]
    fn test_delete_backward_merges_lines() {
        let mut area = buffer("abc\ndef", 1, 0);
        assert!(area.delete_backward());
        assert_eq!(area.text(), "abcdef");
        assert_eq!(area.line_count(), 1);
        assert_eq!(area.cursor(), Position::new(0, 3));
    }

    #[test]
    fn test_repeated_backspace_empties_buffer() {
        for (text, row, col) in [
            ("hello\nworld\n\nend", 3, 3),
            ("x", 0, 1),
            ("\n\n\n", 3, 0),
            ("héllo wörld", 0, 11),
        ] {
            let mut area = buffer(text, row, col);
            area.move_cursor(Position::new(99, 99));
            for _ in 0..100 {
                area.delete_backward();
            }
            assert!(area.is_empty());
            assert_eq!(area.cursor(), Position::new(0, 0));
        }
    }

    #[test]
    fn test_delete_forward() {
        let mut area = buffer("ab\ncd", 0, 1);
        assert!(area.delete_forward());
        assert_eq!(area.text(), "a\ncd");
        assert!(area.delete_forward());
        assert_eq!(area.text(), "acd");
        area.move_cursor(Position::new(0, 3));
        assert!(!area.delete_forward());
        assert_eq!(area.text(), "acd");
    }

    #[test]
    fn test_kill_to_line_end_then_yank_round_trip() {
        let mut area = buffer("hello world\nnext", 0, 5);
        assert!(area.kill_to_line_end());
        assert_eq!(area.text(), "hello\nnext");
        assert_eq!(area.kill_register(), " world");

        assert!(area.yank());
        assert_eq!(area.text(), "hello world\nnext");
        assert_eq!(area.cursor(), Position::new(0, 11));
        assert_eq!(area.kill_register(), " world");
    }

    #[test]
    fn test_kill_to_line_end_at_end_is_noop() {
        let mut area = buffer("abc\ndef", 0, 1);
        area.kill_to_line_end();
        area.move_to_line_end();
        assert!(!area.kill_to_line_end());
        assert_eq!(area.kill_register(), "bc");
        assert_eq!(area.text(), "a\ndef");
    }

    #[test]
    fn test_kill_previous_word() {
        let mut area = buffer("foo bar", 0, 7);
        assert!(area.kill_previous_word());
        assert_eq!(area.text(), "foo ");
        assert_eq!(area.kill_register(), "bar");
        assert_eq!(area.cursor(), Position::new(0, 4));

        // Trailing whitespace is taken along with the word before it.
        let mut area = area_with_cursor_at_end("foo bar   ");
        area.kill_previous_word();
        assert_eq!(area.text(), "foo ");
        assert_eq!(area.kill_register(), "bar   ");

        // Punctuation between word and cursor.
        let mut area = area_with_cursor_at_end("call foo..");
        area.kill_previous_word();
        assert_eq!(area.text(), "call ");
    }

    #[test]
    fn test_kill_previous_word_only_whitespace() {
        let mut area = buffer("   ", 0, 3);
        assert!(area.kill_previous_word());
        assert_eq!(area.text(), "");
        assert_eq!(area.kill_register(), "   ");
    }

    #[test]
    fn test_kill_previous_word_at_line_start_is_noop() {
        let mut area = buffer("abc\ndef", 1, 0);
        assert!(!area.kill_previous_word());
        assert_eq!(area.text(), "abc\ndef");
    }

    fn area_with_cursor_at_end(text: &str) -> TextArea {
        let mut area = TextArea::new();
        area.set_text_and_move_to_end(text);
        area
    }

    #[test]
    fn test_yank_empty_register_is_noop() {
        let mut area = buffer("abc", 0, 1);
        assert!(!area.yank());
        assert_eq!(area.text(), "abc");
    }

    #[test]
    fn test_select_all() {
        let mut empty = TextArea::new();
        empty.select_all();
        assert_eq!(empty.selection(), None);

        let mut area = buffer("ab\ncde", 0, 0);
        area.select_all();
        assert_eq!(
            area.selection(),
            Some((Position::new(0, 0), Position::new(1, 3)))
        );

        // Typing replaces the selection.
        area.insert("x");
        assert_eq!(area.text(), "x");
        assert_eq!(area.selection(), None);
    }

    #[test]
    fn test_insert_multiline() {
        let mut area = buffer("head tail", 0, 5);
        area.insert("one\ntwo\n");
        assert_eq!(area.text(), "head one\ntwo\ntail");
        assert_eq!(area.cursor(), Position::new(2, 0));
    }

    #[test]
    fn test_multibyte_columns() {
        let mut area = buffer("héllo", 0, 2);
        area.insert("X");
        assert_eq!(area.text(), "héXllo");
        assert!(area.delete_backward());
        assert!(area.delete_backward());
        assert_eq!(area.text(), "hllo");
    }

    #[test]
    fn test_cursor_offset_translation() {
        let mut area = buffer("ab\ncde\n", 1, 2);
        assert_eq!(area.cursor_offset(), 5);

        area.set_cursor_offset(3);
        assert_eq!(area.cursor(), Position::new(1, 0));
        area.set_cursor_offset(7);
        assert_eq!(area.cursor(), Position::new(2, 0));
        area.set_cursor_offset(500);
        assert_eq!(area.cursor(), Position::new(2, 0));
    }

    #[test]
    fn test_undo_redo() {
        let mut area = TextArea::new();
        area.insert("a");
        area.insert("b");
        assert!(area.undo());
        assert_eq!(area.text(), "a");
        assert!(area.undo());
        assert_eq!(area.text(), "");
        assert!(!area.undo());
        assert!(area.redo());
        assert_eq!(area.text(), "a");

        area.insert("z");
        assert!(!area.redo());
    }

    #[test]
    fn test_key_bindings() {
        let mut area = buffer("hello world", 0, 11);
        assert_eq!(area.handle_key(&ctrl('a')), EditResult::Handled);
        assert_eq!(area.cursor().col, 0);
        assert_eq!(area.handle_key(&ctrl('k')), EditResult::Changed);
        assert_eq!(area.text(), "");
        assert_eq!(area.handle_key(&ctrl('y')), EditResult::Changed);
        assert_eq!(area.text(), "hello world");
        assert_eq!(area.handle_key(&ctrl('w')), EditResult::Changed);
        assert_eq!(area.text(), "hello ");
        assert_eq!(area.handle_key(&ctrl('_')), EditResult::Changed);
        assert_eq!(area.text(), "hello world");

        let shifted = KeyEvent::new(KeyCode::Char('H'), KeyModifiers::SHIFT);
        assert_eq!(area.handle_key(&shifted), EditResult::Changed);
        assert_eq!(area.text(), "hello worldH");

        assert_eq!(area.handle_key(&ctrl('c')), EditResult::Ignored);
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(area.handle_key(&tab), EditResult::Ignored);
    }
}
