// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sable - configurable LLM agents with tools, knowledge, memory and teams.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod demo;
mod knowledge;
mod memory;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use sable_agent::{ConfigAdapters, ResponsePrinter, build_agent, install_signal_handler};
use sable_config::SableConfig;
use sable_core::SableError;

use crate::demo::{Demo, DemoPlan};

/// Sable - configurable LLM agents.
#[derive(Parser, Debug)]
#[command(name = "sable", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the standard lookup.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one of the built-in demo agents.
    Demo {
        #[arg(value_enum)]
        demo: Demo,
        /// Print the answer at once instead of streaming it.
        #[arg(long)]
        no_stream: bool,
        /// Ask this instead of the demo's own prompts.
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Ask the configured agent a single question.
    Ask {
        prompt: String,
        #[arg(long)]
        no_stream: bool,
        /// Continue an existing session.
        #[arg(long)]
        session: Option<String>,
    },
    /// Launch an interactive REPL session.
    Shell {
        #[arg(long)]
        no_stream: bool,
    },
    /// Manage the knowledge base.
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeCommand,
    },
    /// Inspect long-term user memories.
    Memory {
        #[command(subcommand)]
        action: MemoryCommand,
    },
    /// Manage Sable configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KnowledgeCommand {
    /// Fetch and embed the configured URLs.
    Load {
        /// Drop the table before loading.
        #[arg(long)]
        recreate: bool,
    },
    /// Search the loaded knowledge base.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum MemoryCommand {
    /// List the memories of a user.
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete every memory of a user.
    Clear {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and print a summary.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> SableConfig {
    let loaded = match path {
        Some(path) => sable_config::load_and_validate_path(path),
        None => sable_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            sable_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so streamed answers on stdout stay clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn print_config_summary(config: &SableConfig) {
    println!("{}", "config ok".green());
    println!("  agent:     {}", config.agent.name);
    println!("  model:     {}/{}", config.model.provider, config.model.id);
    println!("  knowledge: {} urls", config.knowledge.urls.len());
    println!("  storage:   {}", config.storage.db_file);
    println!(
        "  memory:    {}",
        if config.memory.enabled {
            config.memory.db_file.as_str()
        } else {
            "disabled"
        }
    );
    if config.team.is_enabled() {
        println!("  team:      {} members", config.team.members.len());
    }
}

async fn ask(
    config: SableConfig,
    prompt: &str,
    stream: bool,
    session: Option<String>,
) -> Result<(), SableError> {
    let agent = build_agent(
        &config,
        &ConfigAdapters::new(&config),
        install_signal_handler(),
    )
    .await?;
    if let Some(session) = session {
        agent.resume_session(session);
    }
    agent.print_response(prompt, stream).await?;
    if agent.storage().is_some()
        && let Some(id) = agent.session_id()
    {
        eprintln!("{}", format!("session: {id}").dimmed());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), SableError> {
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.agent.log_level);

    match cli.command {
        Commands::Demo {
            demo,
            no_stream,
            prompt,
        } => {
            let plan = DemoPlan::new(demo, config).with_prompt(prompt);
            let adapters = ConfigAdapters::new(&plan.config);
            let mut printer =
                ResponsePrinter::new(std::io::stdout(), plan.config.agent.show_tool_calls);
            plan.run(&adapters, install_signal_handler(), !no_stream, &mut printer)
                .await
        }
        Commands::Ask {
            prompt,
            no_stream,
            session,
        } => ask(config, &prompt, !no_stream, session).await,
        Commands::Shell { no_stream } => shell::run_shell(config, !no_stream).await,
        Commands::Knowledge { action } => match action {
            KnowledgeCommand::Load { recreate } => knowledge::load(&config, recreate).await,
            KnowledgeCommand::Search { query, limit } => {
                knowledge::search(&config, &query, limit).await
            }
        },
        Commands::Memory { action } => match action {
            MemoryCommand::List { user } => memory::list(&config, user).await,
            MemoryCommand::Clear { user } => memory::clear(&config, user).await,
        },
        Commands::Config {
            action: ConfigCommand::Check,
        } => {
            print_config_summary(&config);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}
