//! `llmux init` — write a default configuration.
//!
//! - Creates `~/.llmux/config.json` with defaults (never overwrites)
//! - Creates the workspace and history directories

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use llmux_core::config::{get_config_path, save_config, Config};
use llmux_core::utils::get_history_path;

/// Run the init command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "llmux setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    if write_default_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let workspace = Config::default().workspace_path();
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;
    println!("  {} workspace at {}", "✓".green(), workspace.display());

    std::fs::create_dir_all(get_history_path())?;

    println!();
    println!(
        "{}",
        "Next: add an API key under \"providers\" and run `llmux status`.".dimmed()
    );
    println!();
    Ok(())
}

/// Write defaults to `path` unless a file is already there.
/// Returns whether a file was written.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
