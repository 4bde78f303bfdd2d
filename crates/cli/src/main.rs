// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agiraph CLI: run one agent in the foreground.
//!
//! Stdin lines become human messages (prefix with `@name ` to address a
//! worker, `@* ` to broadcast); events stream to stdout. Exit codes: 0 on
//! normal completion; 2 for startup failures (missing keys, unparseable
//! config). In-run failures surface as events, never as a process exit.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod exit_error;

use agiraph_core::{AgentConfig, AgentMode, AgentStatus, KernelError, ModelRef};
use agiraph_engine::{AgentRegistry, Config};
use clap::{Parser, Subcommand};
use exit_error::exit_code;
use tokio::io::AsyncBufReadExt;

#[derive(Parser)]
#[command(name = "agiraph", about = "Multi-agent orchestration runtime", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an agent and run it in the foreground until it finishes.
    Run {
        /// The agent's goal.
        #[arg(long)]
        goal: String,
        /// Coordinator model, written provider/model.
        #[arg(long, default_value = "anthropic/claude-sonnet-4-5")]
        model: String,
        /// Stable agent id; derived from the goal when omitted.
        #[arg(long)]
        agent_id: Option<String>,
        /// Never finish; rely on triggers for each cycle.
        #[arg(long)]
        infinite: bool,
        /// Print every event instead of a terse stream.
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<(), KernelError> {
    let config = Config::from_env()?;
    match cli.command {
        Command::Run { goal, model, agent_id, infinite, verbose } => {
            run_agent(config, goal, model, agent_id, infinite, verbose).await
        }
    }
}

async fn run_agent(
    config: Config,
    goal: String,
    model: String,
    agent_id: Option<String>,
    infinite: bool,
    verbose: bool,
) -> Result<(), KernelError> {
    let agent_id = agent_id.unwrap_or_else(|| slugify(&goal));
    let agent = AgentConfig::new(goal)
        .mode(if infinite { AgentMode::Infinite } else { AgentMode::Finite })
        .coordinator_model(ModelRef::parse(&model));

    let registry = AgentRegistry::new(config);
    let kernel = registry.start(&*agent_id, agent)?;
    println!("agent {agent_id} started (data: {})", kernel.summary().path.display());

    let mut events = kernel.subscribe_events();
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            record = events.recv() => match record {
                Ok(record) => {
                    if verbose || is_noteworthy(record.event.kind()) {
                        println!("[{}] {}", record.ts, record.event.log_summary());
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "event stream lagged");
                }
                Err(_) => break,
            },
            line = stdin.next_line() => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    let (to, content) = parse_input(line.trim());
                    kernel.send_message(to.as_deref(), &content)?;
                }
                Ok(Some(_)) => {}
                _ => {}
            },
            _ = tokio::signal::ctrl_c() => {
                println!("stopping agent {agent_id}");
                kernel.stop()?;
                registry.shutdown().await;
                return Ok(());
            }
        }
        let status = kernel.status();
        if matches!(status, AgentStatus::Completed | AgentStatus::Stopped) {
            println!("agent {agent_id} {status}");
            break;
        }
    }
    registry.shutdown().await;
    Ok(())
}

/// `@name content` addresses a worker, `@* content` broadcasts, anything
/// else goes to the coordinator.
fn parse_input(line: &str) -> (Option<String>, String) {
    if let Some(rest) = line.strip_prefix('@') {
        if let Some((to, content)) = rest.split_once(' ') {
            return (Some(to.to_string()), content.trim().to_string());
        }
    }
    (None, line.to_string())
}

/// Events worth echoing in the terse stream.
fn is_noteworthy(kind: &str) -> bool {
    matches!(
        kind,
        "agent.started"
            | "agent.stopped"
            | "agent.completed"
            | "node.created"
            | "node.completed"
            | "node.failed"
            | "worker.spawned"
            | "message.sent"
            | "human.question"
            | "trigger.fired"
    )
}

/// Derive a filesystem-friendly agent id from a goal.
fn slugify(goal: &str) -> String {
    let slug: String = goal
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let mut compact = String::new();
    for part in slug.split('-').filter(|p| !p.is_empty()).take(5) {
        if !compact.is_empty() {
            compact.push('-');
        }
        compact.push_str(part);
    }
    if compact.is_empty() {
        "agent".to_string()
    } else {
        compact
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
