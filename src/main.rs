// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

mod commands;
mod completion;
mod config;
mod error;
mod git;
mod history;
mod shell;
mod tui;
mod version;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use log::{LevelFilter, info, warn};
use simplelog::{ConfigBuilder, WriteLogger};

use config::ConfigFile;
use history::HistoryManager;
use tui::AppConfig;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "coda")]
#[command(about = "Chat console for a coding agent")]
#[command(version = version::VERSION)]
#[command(styles = STYLES, color = clap::ColorChoice::Always)]
struct Args {
    #[arg(long, help = "Working directory for file completion and shell commands")]
    cwd: Option<PathBuf>,

    #[arg(long, help = "History file (default: ~/.coda/history.jsonl)")]
    history_file: Option<PathBuf>,

    #[arg(long, help = "Start with tool auto-approval enabled")]
    auto_approve: bool,

    #[arg(long, help = "Do not query git for the status bar")]
    no_git: bool,

    #[arg(long, help = "Log file (default: ~/.coda/coda.log)")]
    log_file: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More logging (-v debug, -vv trace)")]
    verbose: u8,
}

fn log_level(verbose: u8, config: &ConfigFile) -> LevelFilter {
    match verbose {
        0 => config.level_filter().unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Log to a file; the terminal belongs to the UI. Failure leaves logging off.
fn init_logging(path: &Path, level: LevelFilter) {
    if level == LevelFilter::Off {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = WriteLogger::init(level, log_config, log_file);
    }
}

fn resolve_cwd(cwd: Option<PathBuf>) -> std::io::Result<PathBuf> {
    let cwd = match cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir()?,
    };
    cwd.canonicalize()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (config_file, startup_notice) = match ConfigFile::load() {
        Ok(config) => (config, None),
        Err(e) => (ConfigFile::default(), Some(e.tui_message())),
    };

    let log_path = args.log_file.clone().unwrap_or_else(|| config_file.log_path());
    init_logging(&log_path, log_level(args.verbose, &config_file));
    info!("coda {} starting", version::VERSION);
    if let Some(notice) = &startup_notice {
        warn!("Ignoring config file {}: {}", ConfigFile::config_path().display(), notice);
    }

    let cwd = match resolve_cwd(args.cwd) {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("coda: invalid working directory: {e}");
            std::process::exit(2);
        }
    };

    let history_path = args
        .history_file
        .unwrap_or_else(|| config_file.history_path());
    let history = HistoryManager::load(history_path);

    let app_config = AppConfig {
        cwd,
        auto_approve: args.auto_approve || config_file.auto_approve,
        git_status: !args.no_git && config_file.git_status,
        startup_notice,
    };

    if let Err(e) = tui::run(app_config, history).await {
        eprintln!("coda: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let args = Args::parse_from([
            "coda",
            "--cwd",
            "/tmp",
            "--history-file",
            "/tmp/h.jsonl",
            "--auto-approve",
            "--no-git",
            "-vv",
        ]);
        assert_eq!(args.cwd.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(args.history_file.as_deref(), Some(Path::new("/tmp/h.jsonl")));
        assert!(args.auto_approve);
        assert!(args.no_git);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_log_level_precedence() {
        let config = ConfigFile {
            log_level: "warn".to_string(),
            ..ConfigFile::default()
        };
        assert_eq!(log_level(0, &config), LevelFilter::Warn);
        assert_eq!(log_level(1, &config), LevelFilter::Debug);
        assert_eq!(log_level(3, &config), LevelFilter::Trace);
    }
}
