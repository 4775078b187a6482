//! llmux CLI — entry point.
//!
//! # Commands
//!
//! - `llmux chat [-m MESSAGE] [--model M] [--provider P]` — one-shot or REPL
//! - `llmux status` — show configuration and the resolved provider
//! - `llmux init` — write a default config

mod chat;
mod helpers;
mod init;
mod repl;
mod status;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use llmux_core::config::{load_config, Config};
use llmux_providers::{create_provider, ChatOptions, LlmProvider};

use crate::chat::ChatSession;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// llmux — talk to any configured LLM backend
#[derive(Parser)]
#[command(name = "llmux", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the configured model (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Override `agents.defaults.model`
        #[arg(long)]
        model: Option<String>,

        /// Override `agents.defaults.provider` (e.g. "claude-cli", "copilot", "groq")
        #[arg(long)]
        provider: Option<String>,

        /// System prompt prepended to the conversation
        #[arg(short, long)]
        system: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and provider status
    Status,

    /// Write a default config to ~/.llmux/config.json
    Init,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            model,
            provider,
            system,
            timeout,
            logs,
        } => {
            init_logging(logs);
            let mut config = load_config(None);
            apply_overrides(&mut config, model, provider);
            run_chat(&config, message, system, timeout.map(Duration::from_secs)).await
        }
        Commands::Status => {
            init_logging(false);
            status::run()
        }
        Commands::Init => init::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

fn apply_overrides(config: &mut Config, model: Option<String>, provider: Option<String>) {
    if let Some(model) = model {
        config.agents.defaults.model = model;
    }
    if let Some(provider) = provider {
        config.agents.defaults.provider = provider;
    }
}

async fn run_chat(
    config: &Config,
    message: Option<String>,
    system: Option<String>,
    timeout: Option<Duration>,
) -> Result<()> {
    let provider = create_provider(config).context("failed to set up provider")?;
    let model = config.agents.defaults.model.clone();
    let label = provider.display_name().to_string();

    info!(provider = %label, model = %model, "starting chat");

    let session = ChatSession::new(provider, model, ChatOptions::from_defaults(&config.agents.defaults))
        .with_timeout(timeout)
        .with_system_prompt(system);

    match message {
        Some(msg) => run_once(session, &msg, &label).await,
        None => repl::run(session).await,
    }
}

async fn run_once<P: LlmProvider>(mut session: ChatSession<P>, message: &str, label: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher = repl::spawn_interrupt_watcher(cancel.clone());
    let result = session.send(message, cancel).await;
    watcher.abort();

    let response = result.context("chat request failed")?;
    helpers::print_response(&response, label);
    Ok(())
}

/// Initialize tracing/logging. `RUST_LOG` wins when set.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("llmux=debug,llmux_core=debug,llmux_providers=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
