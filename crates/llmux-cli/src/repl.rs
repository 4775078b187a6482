//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Ctrl-C while a request is in flight cancels that request only.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use llmux_providers::LlmProvider;

use crate::chat::ChatSession;
use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Run the interactive REPL loop.
pub async fn run<P: LlmProvider>(mut session: ChatSession<P>) -> Result<()> {
    let label = session.provider().display_name().to_string();
    helpers::print_banner(&label, session.model());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if trimmed.eq_ignore_ascii_case("/reset") {
            session.reset();
            println!("(history cleared)\n");
            continue;
        }

        debug!(input = trimmed, "processing input");
        helpers::print_thinking();

        let cancel = CancellationToken::new();
        let watcher = spawn_interrupt_watcher(cancel.clone());
        let result = session.send(trimmed, cancel).await;
        watcher.abort();
        helpers::clear_thinking();

        match result {
            Ok(response) => helpers::print_response(&response, &label),
            Err(e) if e.is_cancellation() => eprintln!("\n(request {e})\n"),
            Err(e) => eprintln!("\nError: {e}\n"),
        }
    }

    save_history(&mut editor);
    Ok(())
}

/// Cancel `token` on the next Ctrl-C.
pub fn spawn_interrupt_watcher(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

fn history_path() -> std::path::PathBuf {
    llmux_core::utils::get_history_path().join("cli_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("/quit"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("hello"));
        assert!(!is_exit_command("/reset"));
    }

    #[test]
    fn history_path_under_data_dir() {
        let path = history_path();
        assert!(path.to_string_lossy().contains(".llmux"));
        assert!(path.ends_with("history/cli_history"));
    }
}
