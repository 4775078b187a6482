//! Shared CLI helpers — response printing, banner, spinner placeholder.

use colored::Colorize;

use llmux_core::types::LlmResponse;

/// Print a model response to stdout, labelled with the backend name.
pub fn print_response(response: &LlmResponse, label: &str) {
    println!();
    println!("{}", label.cyan().bold());
    if response.content.is_empty() && !response.has_tool_calls() {
        println!("{}", "(no response)".dimmed());
    } else if !response.content.is_empty() {
        println!("{}", response.content);
    }
    for call in &response.tool_calls {
        println!(
            "{} {}({})",
            "→ tool call".yellow(),
            call.name,
            format_args_list(&call.arguments)
        );
    }
    if let Some(footer) = usage_footer(response) {
        println!("{}", footer.dimmed());
    }
    println!();
}

fn format_args_list(args: &llmux_core::types::ToolArguments) -> String {
    args.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `[stop · 12 in / 34 out]`, or `None` when there is nothing to report.
pub fn usage_footer(response: &LlmResponse) -> Option<String> {
    let usage = response.usage?;
    Some(format!(
        "[{} · {} in / {} out]",
        if response.finish_reason.is_empty() {
            "?"
        } else {
            response.finish_reason.as_str()
        },
        usage.prompt_tokens,
        usage.completion_tokens
    ))
}

/// Print the banner shown at REPL start.
pub fn print_banner(label: &str, model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "llmux".cyan().bold(), version.dimmed());
    println!("{}", format!("{label} · {model}").dimmed());
    println!(
        "{}",
        "Type a message, \"/reset\" to clear history, or \"exit\" to quit. Ctrl-C cancels a request."
            .dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use llmux_core::types::UsageInfo;

    #[test]
    fn usage_footer_formats_counts() {
        let resp = LlmResponse {
            finish_reason: "stop".into(),
            usage: Some(UsageInfo {
                prompt_tokens: 12,
                completion_tokens: 34,
                total_tokens: 46,
            }),
            ..Default::default()
        };
        assert_eq!(usage_footer(&resp).unwrap(), "[stop · 12 in / 34 out]");
    }

    #[test]
    fn usage_footer_absent_without_usage() {
        assert!(usage_footer(&LlmResponse::default()).is_none());
    }
}
