// SPDX-License-Identifier: MIT
// Main application state for the TUI

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::chat_input::{ChatInput, ChatInputEvent, InputMode, KeyDispatch};
use super::messages::{Message, ShellMessage, Transcript, UserMessage};
use super::status::{StatusBar, format_cwd};
use crate::commands::{self, Command};
use crate::git::{GitUpdate, GitWatcher};
use crate::history::HistoryManager;
use crate::shell::{self, ShellOutput};
use crate::version::VERSION;

const SCROLL_STEP: usize = 10;
const GIT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration options for the TUI application
pub(crate) struct AppConfig {
    pub(crate) cwd: PathBuf,
    pub(crate) auto_approve: bool,
    pub(crate) git_status: bool,
    /// Shown once in the transcript, e.g. a config file problem.
    pub(crate) startup_notice: Option<String>,
}

/// Completion of a `!` command, sent from its task.
struct ShellEvent {
    message_idx: usize,
    result: ShellOutput,
}

struct RunningShell {
    message_idx: usize,
    handle: JoinHandle<()>,
}

pub(crate) struct App {
    pub(crate) input: ChatInput,
    pub(crate) transcript: Transcript,
    pub(crate) status: StatusBar,
    pub(crate) should_exit: bool,
    cwd: PathBuf,
    git: Option<GitWatcher>,
    last_git_refresh: Instant,
    shell: Option<RunningShell>,
    shell_tx: mpsc::UnboundedSender<ShellEvent>,
    shell_rx: mpsc::UnboundedReceiver<ShellEvent>,
}

impl App {
    pub(crate) fn new(config: AppConfig, history: HistoryManager) -> Self {
        info!(
            "Starting in {} with {} history entries from {}",
            config.cwd.display(),
            history.len(),
            history.path().display()
        );

        let input = ChatInput::new(config.cwd.clone(), history, commands::registry());
        let (shell_tx, shell_rx) = mpsc::unbounded_channel();

        let mut transcript = Transcript::default();
        let home = dirs::home_dir();
        transcript.push(Message::Banner(format!(
            "coda v{VERSION}  {}\nType /help for commands, @ to reference files, ! to run a shell command.",
            format_cwd(&config.cwd, home.as_deref())
        )));
        if let Some(notice) = config.startup_notice {
            transcript.push(Message::Error(notice));
        }

        let mut app = Self {
            input,
            transcript,
            status: StatusBar {
                auto_approve: config.auto_approve,
                ..StatusBar::default()
            },
            should_exit: false,
            git: config
                .git_status
                .then(|| GitWatcher::new(config.cwd.clone())),
            cwd: config.cwd,
            last_git_refresh: Instant::now(),
            shell: None,
            shell_tx,
            shell_rx,
        };
        app.refresh_git();
        app.update_tokens();
        app
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::PageUp => self.transcript.scroll_up(SCROLL_STEP),
            KeyCode::PageDown => self.transcript.scroll_down(SCROLL_STEP),
            KeyCode::BackTab => self.toggle_auto_approve(),
            _ => {
                if self.input.handle_key(&key) == KeyDispatch::PassThrough {
                    self.handle_unbound_key(&key);
                }
                self.process_input_events();
            }
        }
    }

    /// Bracketed paste.
    pub(crate) fn handle_paste(&mut self, text: &str) {
        self.input.insert_text(text);
        self.process_input_events();
    }

    fn handle_unbound_key(&mut self, key: &KeyEvent) {
        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if !ctrl_c {
            return;
        }

        if self.shell.is_some() {
            self.interrupt_shell();
        } else if !self.input.is_empty() {
            self.input.clear();
        } else {
            self.should_exit = true;
        }
    }

    fn process_input_events(&mut self) {
        // Handling a submit may edit the input and queue more events.
        loop {
            let events = self.input.drain_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    ChatInputEvent::Submitted { text, mode } => self.submit(text, mode),
                    ChatInputEvent::ModeChanged(mode) => self.status.mode = mode,
                }
            }
        }
    }

    fn submit(&mut self, text: String, mode: InputMode) {
        match mode {
            InputMode::Command => {
                self.transcript.push(Message::User(UserMessage {
                    text: text.clone(),
                    mode,
                }));
                match commands::parse(&text) {
                    Some(command) => self.run_command(command),
                    None => {
                        let name = text.split_whitespace().next().unwrap_or_default();
                        self.transcript
                            .push(Message::Error(format!("Unknown command: {name}")));
                        self.input.set_value(&text);
                    }
                }
            }
            InputMode::Bash => {
                let command = text.strip_prefix('!').unwrap_or(&text).trim();
                if command.is_empty() {
                    self.transcript
                        .push(Message::Error("No command provided".to_string()));
                } else {
                    self.run_shell_command(command);
                }
            }
            InputMode::Normal => {
                self.transcript
                    .push(Message::User(UserMessage { text, mode }));
            }
        }
        self.update_tokens();
    }

    fn run_command(&mut self, command: Command) {
        debug!("Running command {:?}", command);
        match command {
            Command::AutoApprove => {
                self.toggle_auto_approve();
                let state = if self.status.auto_approve { "on" } else { "off" };
                self.transcript
                    .push(Message::Text(format!("Auto-approve is {state}.")));
            }
            Command::Clear => self.transcript.clear(),
            Command::Git => {
                if self.git.is_some() {
                    self.refresh_git();
                    self.transcript
                        .push(Message::Text("Refreshing git status...".to_string()));
                } else {
                    self.transcript
                        .push(Message::Error("Git status is disabled.".to_string()));
                }
            }
            Command::Help => {
                let history = self.input.history();
                self.transcript.push(Message::Text(format!(
                    "{}\n\nHistory: {} entries in {}",
                    commands::help_text(),
                    history.len(),
                    history.path().display()
                )));
            }
            Command::Quit => self.should_exit = true,
        }
    }

    fn run_shell_command(&mut self, command: &str) {
        let message_idx = self
            .transcript
            .push(Message::Shell(ShellMessage::running(command)));
        self.status.message = Some(format!("Executing {command}"));
        self.input.set_disabled(true);
        self.input.set_cursor_active(false);

        let tx = self.shell_tx.clone();
        let cwd = self.cwd.clone();
        let command = command.to_string();
        let handle = tokio::spawn(async move {
            let result = shell::run(&command, &cwd).await;
            let _ = tx.send(ShellEvent {
                message_idx,
                result,
            });
        });
        self.shell = Some(RunningShell {
            message_idx,
            handle,
        });
    }

    fn interrupt_shell(&mut self) {
        let Some(running) = self.shell.take() else {
            return;
        };
        running.handle.abort();
        info!("Interrupted shell command");
        let command = match self.transcript.get_mut(running.message_idx) {
            Some(Message::Shell(shell)) => shell.command.clone(),
            _ => String::new(),
        };
        self.finish_shell(
            running.message_idx,
            ShellOutput {
                command,
                output: "Interrupted".to_string(),
                exit_code: None,
            },
        );
    }

    fn finish_shell(&mut self, message_idx: usize, result: ShellOutput) {
        if result.success() {
            debug!("Shell command finished: {}", result.command);
        } else {
            info!(
                "Shell command failed: {} (exit {:?})",
                result.command, result.exit_code
            );
        }
        if let Some(Message::Shell(shell)) = self.transcript.get_mut(message_idx) {
            shell.finish(result);
        }
        self.status.message = None;
        self.input.set_disabled(false);
        self.input.set_cursor_active(true);
        self.update_tokens();
        self.refresh_git();
    }

    fn toggle_auto_approve(&mut self) {
        self.status.auto_approve = !self.status.auto_approve;
        info!("Auto-approve set to {}", self.status.auto_approve);
    }

    fn update_tokens(&mut self) {
        self.status.tokens = self.transcript.estimate_tokens();
    }

    fn refresh_git(&mut self) {
        if let Some(git) = self.git.as_mut() {
            git.refresh();
            self.last_git_refresh = Instant::now();
        }
    }

    fn apply_git_update(&mut self, update: GitUpdate) {
        if let Some(branch) = update.branch {
            self.status.branch = Some(branch);
        }
        if let Some(dirty) = update.dirty {
            self.status.dirty = dirty;
        }
    }

    /// Collect background results. Returns true when a redraw is needed.
    pub(crate) fn tick(&mut self) -> bool {
        let mut changed = false;

        while let Ok(event) = self.shell_rx.try_recv() {
            let current = self
                .shell
                .as_ref()
                .is_some_and(|running| running.message_idx == event.message_idx);
            if current {
                self.shell = None;
                self.finish_shell(event.message_idx, event.result);
                changed = true;
            }
        }

        if let Some(update) = self.git.as_mut().and_then(GitWatcher::poll) {
            self.apply_git_update(update);
            changed = true;
        }
        if self.last_git_refresh.elapsed() >= GIT_REFRESH_INTERVAL {
            self.refresh_git();
        }

        changed
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.shell.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_c() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
    }

    fn new_app(dir: &TempDir) -> App {
        let config = AppConfig {
            cwd: dir.path().to_path_buf(),
            auto_approve: false,
            git_status: false,
            startup_notice: None,
        };
        App::new(config, HistoryManager::load(dir.path().join("history.jsonl")))
    }

    fn submit(app: &mut App, text: &str) {
        app.handle_paste(text);
        // Dismiss any completion popup so Enter submits.
        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Enter));
    }

    fn last_text(app: &App) -> String {
        app.transcript.texts().last().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_banner_and_startup_notice() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            cwd: dir.path().to_path_buf(),
            auto_approve: true,
            git_status: false,
            startup_notice: Some("Config error: bad".to_string()),
        };
        let app = App::new(config, HistoryManager::load(dir.path().join("h.jsonl")));
        let texts = app.transcript.texts();
        assert!(texts[0].starts_with(&format!("coda v{VERSION}")));
        assert_eq!(texts[1], "Error: Config error: bad");
        assert!(app.status.auto_approve);
        assert!(app.status.tokens > 0);
    }

    #[tokio::test]
    async fn test_help_command() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        submit(&mut app, "/help");
        let help = last_text(&app);
        assert!(help.contains("/auto-approve"));
        assert!(help.contains("History: 1 entries"));
        assert_eq!(app.status.mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        submit(&mut app, "/bogus now");
        assert_eq!(last_text(&app), "Error: Unknown command: /bogus");
        assert_eq!(app.input.value(), "/bogus now");
        assert_eq!(app.status.mode, InputMode::Command);
    }

    #[tokio::test]
    async fn test_clear_and_quit() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        submit(&mut app, "hello");
        assert_eq!(last_text(&app), "> hello");
        submit(&mut app, "/clear");
        assert_eq!(app.transcript.len(), 0);
        assert_eq!(app.status.tokens, 0);
        submit(&mut app, "/quit");
        assert!(app.should_exit);
    }

    #[tokio::test]
    async fn test_auto_approve_toggles() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        app.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert!(app.status.auto_approve);
        submit(&mut app, "/auto-approve");
        assert!(!app.status.auto_approve);
        assert_eq!(last_text(&app), "Auto-approve is off.");
    }

    #[tokio::test]
    async fn test_ctrl_c_clears_then_exits() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        app.handle_paste("draft");
        app.handle_key(ctrl_c());
        assert!(app.input.is_empty());
        assert!(!app.should_exit);
        app.handle_key(ctrl_c());
        assert!(app.should_exit);
    }

    #[tokio::test]
    async fn test_mode_reaches_status_bar() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        app.handle_key(key(KeyCode::Char('!')));
        assert_eq!(app.status.mode, InputMode::Bash);
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.status.mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_shell_command_runs_in_background() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        submit(&mut app, "!echo hi");
        assert!(app.is_busy());
        assert!(app.input.is_disabled());
        assert!(app.status.message.is_some());

        tokio::time::timeout(Duration::from_secs(10), async {
            while !app.tick() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(!app.is_busy());
        assert!(!app.input.is_disabled());
        assert_eq!(app.status.message, None);
        assert_eq!(last_text(&app), "! echo hi\n  hi");
    }

    #[tokio::test]
    async fn test_ctrl_c_interrupts_shell() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        submit(&mut app, "!sleep 5");
        assert!(app.is_busy());
        app.handle_key(ctrl_c());
        assert!(!app.is_busy());
        assert!(!app.should_exit);
        assert_eq!(last_text(&app), "! sleep 5\n  Interrupted\n  [killed]");
    }

    #[tokio::test]
    async fn test_empty_bash_command() {
        let dir = TempDir::new().unwrap();
        let mut app = new_app(&dir);
        submit(&mut app, "!  ");
        // "!" alone is still a submission in bash mode.
        assert_eq!(last_text(&app), "Error: No command provided");
        assert!(!app.is_busy());
    }

    #[test]
    fn test_git_update_keeps_missing_fields() {
        let dir = TempDir::new().unwrap();
        let (shell_tx, shell_rx) = mpsc::unbounded_channel();
        let mut app = App {
            input: ChatInput::new(
                dir.path().to_path_buf(),
                HistoryManager::load(dir.path().join("h.jsonl")),
                Vec::new(),
            ),
            transcript: Transcript::default(),
            status: StatusBar::default(),
            should_exit: false,
            cwd: dir.path().to_path_buf(),
            git: None,
            last_git_refresh: Instant::now(),
            shell: None,
            shell_tx,
            shell_rx,
        };
        app.apply_git_update(GitUpdate {
            generation: 1,
            branch: Some("main".to_string()),
            dirty: Some(true),
        });
        app.apply_git_update(GitUpdate {
            generation: 2,
            branch: None,
            dirty: None,
        });
        assert_eq!(app.status.branch.as_deref(), Some("main"));
        assert!(app.status.dirty);
    }
}
