// SPDX-License-Identifier: MIT
// Terminal front-end: setup, teardown and the event loop

mod app;
mod chat_input;
mod draw;
mod editor;
mod layout;
mod messages;
mod popup;
mod status;

use std::io;
use std::time::Duration;

use crossterm::{
    cursor::{Hide as HideCursor, Show as ShowCursor},
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use log::{debug, info};
use ratatui::prelude::*;
use tokio::time::interval;

use crate::error::Result;
use crate::history::HistoryManager;

pub(crate) use app::AppConfig;
use app::App;
use draw::draw;

const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Main entry point for the TUI interface
pub(crate) async fn run(config: AppConfig, history: HistoryManager) -> Result<()> {
    setup_terminal()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let result = match Terminal::new(CrosstermBackend::new(io::stdout())) {
        Ok(mut terminal) => run_app(&mut terminal, App::new(config, history)).await,
        Err(e) => Err(e.into()),
    };

    restore_terminal()?;
    info!("Exited");
    result
}

fn setup_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(
        io::stdout(),
        EnterAlternateScreen,
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
                | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
        )
    )?;
    execute!(io::stdout(), EnableBracketedPaste)?;
    Ok(())
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        io::stdout(),
        ShowCursor,
        PopKeyboardEnhancementFlags,
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<()> {
    let mut event_stream = EventStream::new();
    let mut tick_interval = interval(TICK_INTERVAL);
    let mut needs_redraw = true;

    loop {
        if app.should_exit {
            return Ok(());
        }

        if needs_redraw {
            terminal.draw(|frame| draw(frame, &mut app))?;
            // ratatui does not always hide the cursor when none was placed
            if app.is_busy() {
                execute!(io::stdout(), HideCursor)?;
            } else {
                execute!(io::stdout(), ShowCursor)?;
            }
            needs_redraw = false;
        }

        tokio::select! {
            _ = tick_interval.tick() => {
                if app.tick() {
                    needs_redraw = true;
                }
            }
            maybe_event = event_stream.next() => {
                let Some(event_result) = maybe_event else {
                    debug!("Terminal event stream closed");
                    return Ok(());
                };

                match event_result? {
                    Event::Key(key) => {
                        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            continue;
                        }
                        app.handle_key(key);
                        needs_redraw = true;
                    }
                    Event::Paste(text) => {
                        app.handle_paste(&text);
                        needs_redraw = true;
                    }
                    Event::Resize(_, _) => needs_redraw = true,
                    _ => {}
                }
            }
        }
    }
}
