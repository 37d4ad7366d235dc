// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sable shell` command implementation.
//!
//! Interactive REPL with a colored prompt and readline history. Every line
//! is one run of the configured agent; with history enabled the runs share
//! one session until `/new`.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sable_agent::{Agent, ConfigAdapters, build_agent};
use sable_config::SableConfig;
use sable_core::SableError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Empty,
    Quit,
    NewSession,
    ShowSession,
    Help,
    Prompt(&'a str),
}

fn parse_line(line: &str) -> Line<'_> {
    match line.trim() {
        "" => Line::Empty,
        "/quit" | "/exit" => Line::Quit,
        "/new" => Line::NewSession,
        "/session" => Line::ShowSession,
        "/help" => Line::Help,
        prompt => Line::Prompt(prompt),
    }
}

fn print_help() {
    println!("  {}      start a new session", "/new".yellow());
    println!("  {}  show the current session id", "/session".yellow());
    println!("  {}     leave the shell", "/quit".yellow());
}

/// Runs the `sable shell` REPL.
///
/// Ctrl-C and Ctrl-D at the prompt leave the shell.
pub async fn run_shell(config: SableConfig, stream: bool) -> Result<(), SableError> {
    let agent = build_agent(
        &config,
        &ConfigAdapters::new(&config),
        CancellationToken::new(),
    )
    .await?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| SableError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("sable shell ({})", agent.name()).bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", "sable".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => match parse_line(&line) {
                Line::Empty => continue,
                Line::Quit => break,
                Line::Help => print_help(),
                Line::NewSession => {
                    agent.new_session();
                    println!("{}", "new session".dimmed());
                }
                Line::ShowSession => show_session(&agent),
                Line::Prompt(input) => {
                    let _ = rl.add_history_entry(input);
                    if let Err(e) = agent.print_response(input, stream).await {
                        eprintln!("{}: {e}", "error".red());
                    }
                }
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    if let Some(storage) = agent.storage() {
        storage.close().await?;
    }
    debug!("shell closed");
    println!("{}", "goodbye".dimmed());
    Ok(())
}

fn show_session(agent: &Agent) {
    match agent.session_id() {
        Some(id) => println!("{}", id.dimmed()),
        None => println!("{}", "no session yet".dimmed()),
    }
}
