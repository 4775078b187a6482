//! Utility helpers — path resolution and string manipulation.

use std::path::PathBuf;

/// Get the llmux data directory (e.g. `~/.llmux/`).
pub fn get_data_path() -> PathBuf {
    home_dir().join(".llmux")
}

/// Get the stored OAuth credentials file (e.g. `~/.llmux/auth.json`).
pub fn get_auth_path() -> PathBuf {
    get_data_path().join("auth.json")
}

/// Get the REPL history directory (e.g. `~/.llmux/history/`).
pub fn get_history_path() -> PathBuf {
    get_data_path().join("history")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> PathBuf {
    dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
