// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Slash command definitions.

/// Command identifier for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    AutoApprove,
    Clear,
    Git,
    Help,
    Quit,
}

#[derive(Debug, Clone)]
pub(crate) struct SlashCommand {
    pub command: Command,
    pub name: &'static str,
    pub description: &'static str,
}

pub(crate) const COMMANDS: &[SlashCommand] = &[
    SlashCommand {
        command: Command::AutoApprove,
        name: "auto-approve",
        description: "Toggle automatic tool approval",
    },
    SlashCommand {
        command: Command::Clear,
        name: "clear",
        description: "Clear the transcript",
    },
    SlashCommand {
        command: Command::Git,
        name: "git",
        description: "Refresh git branch status",
    },
    SlashCommand {
        command: Command::Help,
        name: "help",
        description: "Show available commands and key bindings",
    },
    SlashCommand {
        command: Command::Quit,
        name: "quit",
        description: "Exit the application",
    },
];

/// Name/description pairs handed to the slash completion controller.
pub(crate) fn registry() -> Vec<(String, String)> {
    COMMANDS
        .iter()
        .map(|cmd| (cmd.name.to_string(), cmd.description.to_string()))
        .collect()
}

/// Parse a submitted command line (with or without the leading "/").
/// Arguments after the command name are ignored.
pub(crate) fn parse(input: &str) -> Option<Command> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input);
    let name = input
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name)
        .map(|cmd| cmd.command)
}

/// Text shown by `/help`.
pub(crate) fn help_text() -> String {
    let width = COMMANDS.iter().map(|cmd| cmd.name.len()).max().unwrap_or(0);
    let mut text = String::from("Commands:\n");
    for cmd in COMMANDS {
        text.push_str(&format!(
            "  /{:<width$}  {}\n",
            cmd.name,
            cmd.description,
            width = width
        ));
    }
    text.push_str(
        "\nKeys:\n  Enter send • Ctrl+J newline • Up/Down history • Tab accept completion\n  \
         @ files • / commands • ! shell • Shift+Tab approval • Ctrl+C quit",
    );
    text
}
