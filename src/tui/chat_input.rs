// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! The prompt input: editor, completion, history and popup wired together.
//!
//! Raw key events go through [`classify_key`] first, which decides whether a
//! key inserts a newline, drives the completion popup, submits, navigates
//! history, or falls through to ordinary editing. Mode detection and
//! completion recomputation run after every buffer mutation.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;
use ratatui::{prelude::*, widgets::Paragraph};

use super::editor::{EditResult, TextArea};
use super::layout::{cursor_position, input_display_lines, wrap_text};
use super::popup::CompletionPopup;
use crate::completion::{
    CompletionManager, CompletionResult, FuzzyFileController, ReplacementSpan,
    SlashCommandController, byte_index,
};
use crate::history::HistoryManager;

const PROMPT_WIDTH: u16 = 2;
const MAX_INPUT_ROWS: u16 = 8;

pub(crate) const BASH_COLOR: Color = Color::Rgb(255, 121, 198);
pub(crate) const COMMAND_COLOR: Color = Color::Rgb(189, 147, 249);

/// Input mode, derived from the first character of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum InputMode {
    #[default]
    Normal,
    Bash,
    Command,
}

impl InputMode {
    pub(crate) fn from_text(text: &str) -> Self {
        match text.chars().next() {
            Some('!') => InputMode::Bash,
            Some('/') => InputMode::Command,
            _ => InputMode::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatInputEvent {
    Submitted { text: String, mode: InputMode },
    ModeChanged(InputMode),
}

/// What the surrounding application should do with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyDispatch {
    Consumed,
    PassThrough,
    /// Consumed, and a `Submitted` event is waiting in `drain_events`.
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    InsertNewline,
    Completion,
    DismissCompletion,
    Submit,
    HistoryPrevious,
    HistoryNext,
    Edit,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DispatchState {
    pub(crate) completion_active: bool,
    pub(crate) row: usize,
    pub(crate) line_count: usize,
}

fn is_newline_chord(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter => key
            .modifiers
            .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT | KeyModifiers::CONTROL),
        KeyCode::Char('j') => key.modifiers == KeyModifiers::CONTROL,
        _ => false,
    }
}

/// Decide how a key is handled. Earlier rules take precedence.
pub(crate) fn classify_key(key: &KeyEvent, state: DispatchState) -> KeyAction {
    if is_newline_chord(key) {
        return KeyAction::InsertNewline;
    }

    if state.completion_active {
        match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Tab | KeyCode::Enter => {
                return KeyAction::Completion;
            }
            KeyCode::Esc => return KeyAction::DismissCompletion,
            _ => {}
        }
    }

    let plain = key.modifiers == KeyModifiers::NONE;
    match key.code {
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Up if plain && state.row == 0 => KeyAction::HistoryPrevious,
        KeyCode::Down if plain && state.row + 1 >= state.line_count => KeyAction::HistoryNext,
        _ => KeyAction::Edit,
    }
}

pub(crate) struct ChatInput {
    editor: TextArea,
    completion: CompletionManager,
    history: HistoryManager,
    popup: CompletionPopup,
    mode: InputMode,
    disabled: bool,
    cursor_active: bool,
    events: Vec<ChatInputEvent>,
}

impl ChatInput {
    /// `registry` is the list of (command name, description) pairs offered
    /// after "/"; file completion searches under `cwd`.
    pub(crate) fn new(
        cwd: PathBuf,
        history: HistoryManager,
        registry: Vec<(String, String)>,
    ) -> Self {
        let completion = CompletionManager::new(vec![
            Box::new(SlashCommandController::new(registry)),
            Box::new(FuzzyFileController::new(cwd)),
        ]);
        Self {
            editor: TextArea::new(),
            completion,
            history,
            popup: CompletionPopup::default(),
            mode: InputMode::Normal,
            disabled: false,
            cursor_active: true,
            events: Vec::new(),
        }
    }

    pub(crate) fn handle_key(&mut self, key: &KeyEvent) -> KeyDispatch {
        if self.disabled {
            return KeyDispatch::PassThrough;
        }

        let cursor = self.editor.cursor();
        let state = DispatchState {
            completion_active: self.completion.is_active(),
            row: cursor.row,
            line_count: self.editor.line_count(),
        };

        match classify_key(key, state) {
            KeyAction::InsertNewline => {
                self.editor.insert_newline();
                self.text_changed();
            }
            KeyAction::Completion => {
                let text = self.editor.text();
                let result = self
                    .completion
                    .on_key(key, &text, self.editor.cursor_offset());
                if let CompletionResult::Accepted(span) = result {
                    self.replace_range(span);
                }
                self.refresh_popup();
            }
            KeyAction::DismissCompletion => {
                self.completion.reset();
                self.refresh_popup();
                return self.edit(key);
            }
            KeyAction::Submit => {
                return if self.submit() {
                    KeyDispatch::Submit
                } else {
                    KeyDispatch::Consumed
                };
            }
            KeyAction::HistoryPrevious => {
                let current = self.editor.text();
                if let Some(entry) = self.history.get_previous(&current) {
                    self.restore_from_history(&entry);
                }
            }
            KeyAction::HistoryNext => {
                if let Some(entry) = self.history.get_next() {
                    self.restore_from_history(&entry);
                }
            }
            KeyAction::Edit => return self.edit(key),
        }
        KeyDispatch::Consumed
    }

    fn edit(&mut self, key: &KeyEvent) -> KeyDispatch {
        match self.editor.handle_key(key) {
            EditResult::Ignored => return KeyDispatch::PassThrough,
            EditResult::Handled => self.recompute_completion(),
            EditResult::Changed => self.text_changed(),
        }
        KeyDispatch::Consumed
    }

    /// Insert pasted text at the cursor.
    pub(crate) fn insert_text(&mut self, text: &str) {
        if self.disabled || text.is_empty() {
            return;
        }
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.editor.insert(&normalized);
        self.text_changed();
    }

    pub(crate) fn value(&self) -> String {
        self.editor.text()
    }

    pub(crate) fn set_value(&mut self, text: &str) {
        self.editor.set_text_and_move_to_end(text);
        self.text_changed();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.editor.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.editor.clear();
        self.text_changed();
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.completion.reset();
            self.refresh_popup();
        }
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn set_cursor_active(&mut self, active: bool) {
        self.cursor_active = active;
    }

    pub(crate) fn mode(&self) -> InputMode {
        self.mode
    }

    pub(crate) fn popup(&self) -> &CompletionPopup {
        &self.popup
    }

    pub(crate) fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub(crate) fn drain_events(&mut self) -> Vec<ChatInputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Splice an accepted suggestion into the buffer.
    fn replace_range(&mut self, span: ReplacementSpan) {
        let text = self.editor.text();
        let len = text.chars().count();
        let start = span.start.min(len);
        let end = span.end.clamp(start, len);

        let prefix = &text[..byte_index(&text, start)];
        let suffix = &text[byte_index(&text, end)..];
        let mut replacement = span.replacement;
        if !replacement.ends_with('/') && !suffix.starts_with(' ') {
            replacement.push(' ');
        }

        let cursor = start + replacement.chars().count();
        let updated = format!("{prefix}{replacement}{suffix}");
        self.editor.set_text(&updated);
        self.editor.set_cursor_offset(cursor);
        self.text_changed();
    }

    fn submit(&mut self) -> bool {
        let text = self.editor.text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }

        debug!("Submitting {:?} input ({} chars)", self.mode, trimmed.len());
        self.history.add(trimmed);
        self.events.push(ChatInputEvent::Submitted {
            text: trimmed.to_string(),
            mode: self.mode,
        });
        self.editor.clear();
        self.completion.reset();
        self.set_mode(InputMode::Normal);
        self.refresh_popup();
        true
    }

    fn restore_from_history(&mut self, entry: &str) {
        self.editor.set_text_and_move_to_end(entry);
        self.set_mode(InputMode::from_text(entry));
        self.completion.reset();
        self.refresh_popup();
    }

    fn text_changed(&mut self) {
        let text = self.editor.text();
        self.set_mode(InputMode::from_text(&text));
        self.completion
            .on_text_changed(&text, self.editor.cursor_offset());
        self.refresh_popup();
    }

    /// The cursor moved without an edit; the token under it may differ.
    fn recompute_completion(&mut self) {
        let text = self.editor.text();
        self.completion
            .on_text_changed(&text, self.editor.cursor_offset());
        self.refresh_popup();
    }

    fn set_mode(&mut self, mode: InputMode) {
        if mode != self.mode {
            self.mode = mode;
            self.events.push(ChatInputEvent::ModeChanged(mode));
        }
    }

    fn refresh_popup(&mut self) {
        self.completion.render(&mut self.popup);
    }

    /// Rows the input needs at `width`, capped.
    pub(crate) fn height(&self, width: u16) -> u16 {
        let text_width = width.saturating_sub(PROMPT_WIDTH).max(1);
        let rows = input_display_lines(self.editor.lines(), text_width);
        rows.clamp(1, MAX_INPUT_ROWS as usize) as u16
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect) {
        if area.width <= PROMPT_WIDTH || area.height == 0 {
            return;
        }

        let (prompt, prompt_color) = match self.mode {
            InputMode::Bash => ("!", BASH_COLOR),
            InputMode::Command => (">", COMMAND_COLOR),
            InputMode::Normal => (">", Color::Rgb(200, 200, 200)),
        };
        let prompt_area = Rect::new(area.x, area.y, PROMPT_WIDTH, 1);
        frame.render_widget(
            Paragraph::new(prompt).style(Style::default().fg(prompt_color)),
            prompt_area,
        );

        let text_area = Rect::new(
            area.x + PROMPT_WIDTH,
            area.y,
            area.width - PROMPT_WIDTH,
            area.height,
        );
        let (cursor_row, cursor_col) =
            cursor_position(self.editor.lines(), self.editor.cursor(), text_area.width);
        let scroll = cursor_row.saturating_sub(text_area.height.saturating_sub(1) as usize);

        let mut style = Style::default().fg(Color::Rgb(220, 220, 220));
        if self.disabled {
            style = style.fg(Color::DarkGray);
        } else if self.editor.selection().is_some() {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let rows: Vec<Line> = wrap_text(&self.editor.text(), text_area.width)
            .into_iter()
            .skip(scroll)
            .take(text_area.height as usize)
            .map(|row| Line::styled(row, style))
            .collect();
        frame.render_widget(Paragraph::new(rows), text_area);

        if self.cursor_active && !self.disabled {
            // cursor_row - scroll < text_area.height
            let row = (cursor_row - scroll) as u16;
            let x = text_area
                .x
                .saturating_add(cursor_col)
                .min(text_area.right().saturating_sub(1));
            let y = text_area
                .y
                .saturating_add(row)
                .min(text_area.bottom().saturating_sub(1));
            frame.set_cursor_position((x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use std::fs;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut ChatInput, text: &str) {
        for c in text.chars() {
            input.handle_key(&key(KeyCode::Char(c)));
        }
    }

    fn fixture() -> (TempDir, ChatInput) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/main.py"), "").unwrap();
        let history = HistoryManager::load(dir.path().join("state/history.jsonl"));
        let input = ChatInput::new(dir.path().to_path_buf(), history, commands::registry());
        (dir, input)
    }

    fn state(completion_active: bool, row: usize, line_count: usize) -> DispatchState {
        DispatchState {
            completion_active,
            row,
            line_count,
        }
    }

    #[test]
    fn test_classify_newline_chords_win() {
        let idle = state(true, 0, 1);
        for chord in [
            KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT),
            KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT),
            KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL),
            KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL),
        ] {
            assert_eq!(classify_key(&chord, idle), KeyAction::InsertNewline);
        }
    }

    #[test]
    fn test_classify_completion_before_submit_and_history() {
        let active = state(true, 0, 1);
        assert_eq!(classify_key(&key(KeyCode::Enter), active), KeyAction::Completion);
        assert_eq!(classify_key(&key(KeyCode::Up), active), KeyAction::Completion);
        assert_eq!(classify_key(&key(KeyCode::Tab), active), KeyAction::Completion);
        assert_eq!(
            classify_key(&key(KeyCode::Esc), active),
            KeyAction::DismissCompletion
        );
        assert_eq!(classify_key(&key(KeyCode::Char('x')), active), KeyAction::Edit);
    }

    #[test]
    fn test_classify_history_only_on_edge_rows() {
        assert_eq!(
            classify_key(&key(KeyCode::Up), state(false, 0, 3)),
            KeyAction::HistoryPrevious
        );
        assert_eq!(classify_key(&key(KeyCode::Up), state(false, 1, 3)), KeyAction::Edit);
        assert_eq!(
            classify_key(&key(KeyCode::Down), state(false, 2, 3)),
            KeyAction::HistoryNext
        );
        assert_eq!(classify_key(&key(KeyCode::Down), state(false, 0, 3)), KeyAction::Edit);
        assert_eq!(classify_key(&key(KeyCode::Enter), state(false, 1, 3)), KeyAction::Submit);
    }

    #[test]
    fn test_submit_emits_trimmed_text_and_clears() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "  hello  ");
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), KeyDispatch::Submit);
        assert_eq!(
            input.drain_events(),
            vec![ChatInputEvent::Submitted {
                text: "hello".to_string(),
                mode: InputMode::Normal,
            }]
        );
        assert_eq!(input.value(), "");
        assert_eq!(input.history().len(), 1);
    }

    #[test]
    fn test_submit_whitespace_is_noop() {
        let (_dir, mut input) = fixture();
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), KeyDispatch::Consumed);
        type_text(&mut input, "   ");
        input.handle_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut input, " ");
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), KeyDispatch::Consumed);
        assert!(input.drain_events().is_empty());
        assert_eq!(input.value(), "   \n ");
        assert_eq!(input.history().len(), 0);
    }

    #[test]
    fn test_mode_tracks_first_character() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "!ls -la");
        assert_eq!(input.mode(), InputMode::Bash);
        assert_eq!(
            input.drain_events(),
            vec![ChatInputEvent::ModeChanged(InputMode::Bash)]
        );

        input.handle_key(&KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        input.handle_key(&key(KeyCode::Delete));
        assert_eq!(input.mode(), InputMode::Normal);

        input.set_value("/help");
        assert_eq!(input.mode(), InputMode::Command);
        assert_eq!(
            input.drain_events(),
            vec![
                ChatInputEvent::ModeChanged(InputMode::Normal),
                ChatInputEvent::ModeChanged(InputMode::Command),
            ]
        );
    }

    #[test]
    fn test_submit_carries_mode_then_resets() {
        let (_dir, mut input) = fixture();
        input.set_value("!echo hi");
        input.drain_events();
        input.handle_key(&key(KeyCode::Enter));
        assert_eq!(
            input.drain_events(),
            vec![
                ChatInputEvent::Submitted {
                    text: "!echo hi".to_string(),
                    mode: InputMode::Bash,
                },
                ChatInputEvent::ModeChanged(InputMode::Normal),
            ]
        );
        assert_eq!(input.mode(), InputMode::Normal);
    }

    #[test]
    fn test_file_completion_accept_adds_space() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "@src/mai");
        assert!(input.popup().is_visible());
        assert_eq!(input.handle_key(&key(KeyCode::Tab)), KeyDispatch::Consumed);
        assert_eq!(input.value(), "src/main.py ");
        assert!(!input.popup().is_visible());
        assert_eq!(input.editor.cursor_offset(), 12);
    }

    #[test]
    fn test_directory_completion_has_no_trailing_space() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "look @nest");
        input.handle_key(&key(KeyCode::Tab));
        assert_eq!(input.value(), "look src/nested/");
    }

    #[test]
    fn test_enter_accepts_instead_of_submitting() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "/he");
        assert!(input.popup().is_visible());
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), KeyDispatch::Consumed);
        assert_eq!(input.value(), "/help ");
        input.drain_events();

        assert_eq!(input.handle_key(&key(KeyCode::Enter)), KeyDispatch::Submit);
        assert_eq!(
            input.drain_events()[0],
            ChatInputEvent::Submitted {
                text: "/help".to_string(),
                mode: InputMode::Command,
            }
        );
    }

    #[test]
    fn test_escape_dismisses_popup_and_passes_through() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "/");
        assert!(input.popup().is_visible());
        assert_eq!(
            input.handle_key(&key(KeyCode::Esc)),
            KeyDispatch::PassThrough
        );
        assert!(!input.popup().is_visible());
        assert_eq!(input.value(), "/");
        // Without a popup Esc is not consumed either.
        assert_eq!(
            input.handle_key(&key(KeyCode::Esc)),
            KeyDispatch::PassThrough
        );
    }

    #[test]
    fn test_history_navigation_restores_draft() {
        let (_dir, mut input) = fixture();
        for entry in ["first", "second"] {
            type_text(&mut input, entry);
            input.handle_key(&key(KeyCode::Enter));
        }
        type_text(&mut input, "draft");

        input.handle_key(&key(KeyCode::Up));
        assert_eq!(input.value(), "second");
        assert_eq!(input.editor.cursor_offset(), 6);
        input.handle_key(&key(KeyCode::Up));
        assert_eq!(input.value(), "first");
        input.handle_key(&key(KeyCode::Up));
        assert_eq!(input.value(), "first");

        input.handle_key(&key(KeyCode::Down));
        input.handle_key(&key(KeyCode::Down));
        assert_eq!(input.value(), "draft");
    }

    #[test]
    fn test_history_restore_does_not_open_popup() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "/help");
        input.handle_key(&key(KeyCode::Esc));
        input.handle_key(&key(KeyCode::Enter));
        input.handle_key(&key(KeyCode::Up));
        assert_eq!(input.value(), "/help");
        assert_eq!(input.mode(), InputMode::Command);
        assert!(!input.popup().is_visible());
    }

    #[test]
    fn test_disabled_passes_everything_through() {
        let (_dir, mut input) = fixture();
        type_text(&mut input, "/");
        input.set_disabled(true);
        assert!(!input.popup().is_visible());
        assert_eq!(
            input.handle_key(&key(KeyCode::Char('x'))),
            KeyDispatch::PassThrough
        );
        assert_eq!(input.value(), "/");
    }

    #[test]
    fn test_unbound_keys_pass_through() {
        let (_dir, mut input) = fixture();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input.handle_key(&ctrl_c), KeyDispatch::PassThrough);
    }

    #[test]
    fn test_paste_normalizes_line_endings() {
        let (_dir, mut input) = fixture();
        input.insert_text("one\r\ntwo\rthree");
        assert_eq!(input.value(), "one\ntwo\nthree");
        assert_eq!(input.height(80), 3);
    }

    #[test]
    fn test_render_huge_paste_keeps_cursor_in_view() {
        let (_dir, mut input) = fixture();
        input.insert_text(&"x\n".repeat(70_000));
        assert_eq!(input.height(40), MAX_INPUT_ROWS);

        let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(40, 12)).unwrap();
        terminal
            .draw(|frame| input.render(frame, Rect::new(0, 3, 40, 8)))
            .unwrap();
        // Cursor sits on the empty last line, on the bottom row of the area.
        assert_eq!(
            terminal.get_cursor_position().unwrap(),
            Position::new(PROMPT_WIDTH, 10)
        );
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(PROMPT_WIDTH, 9)].symbol(), "x");
    }
}
