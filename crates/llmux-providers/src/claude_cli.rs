//! CLI-driven backend: runs the local `claude` binary in print mode.
//!
//! The conversation is rendered to a single prompt on stdin; system messages
//! and tool definitions go into `--system-prompt`. The model answers tool
//! requests with an inline `{"tool_calls": [...]}` JSON block which is lifted
//! back out into structured tool calls.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use llmux_core::types::{LlmResponse, Message, Role, ToolArguments, ToolCall, ToolDefinition, UsageInfo};

use crate::context::RequestContext;
use crate::error::ProviderError;
use crate::http_provider::parse_tool_arguments;
use crate::selection::ProviderSelection;
use crate::traits::{ChatOptions, LlmProvider};

/// Binary invoked when no override is given.
pub const CLAUDE_BINARY: &str = "claude";

// ─────────────────────────────────────────────
// Command runner
// ─────────────────────────────────────────────

/// Captured result of one subprocess run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Runs a program to completion. Swappable so tests never spawn `claude`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
        input: &str,
    ) -> Result<CommandOutput, ProviderError>;
}

/// Spawns real processes via `tokio::process`.
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
        input: &str,
    ) -> Result<CommandOutput, ProviderError> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::Cli(format!("failed to start `{program}`: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
            // Close stdin so the CLI sees EOF.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        })
    }
}

// ─────────────────────────────────────────────
// ClaudeCliProvider
// ─────────────────────────────────────────────

pub struct ClaudeCliProvider {
    program: String,
    workspace: PathBuf,
    default_model: String,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for ClaudeCliProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeCliProvider")
            .field("program", &self.program)
            .field("workspace", &self.workspace)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ClaudeCliProvider {
    pub fn new(workspace: impl Into<PathBuf>, default_model: impl Into<String>) -> Self {
        ClaudeCliProvider {
            program: CLAUDE_BINARY.to_string(),
            workspace: workspace.into(),
            default_model: default_model.into(),
            runner: Arc::new(SystemCommandRunner),
        }
    }

    pub fn from_selection(selection: &ProviderSelection) -> Self {
        let workspace = selection
            .workspace
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(workspace, selection.model.clone())
    }

    /// Use a different binary (e.g. an absolute path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn build_args(&self, model: &str, system_prompt: &str) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if !model.is_empty() {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        if !system_prompt.is_empty() {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.to_string());
        }
        args
    }
}

#[async_trait]
impl LlmProvider for ClaudeCliProvider {
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        _options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError> {
        let model = if model.is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        let system_prompt = render_system_prompt(messages, tools);
        let prompt = render_prompt(messages);
        let args = self.build_args(model, &system_prompt);

        debug!(
            program = %self.program,
            workspace = %self.workspace.display(),
            model,
            messages = messages.len(),
            tools = tools.len(),
            "Running CLI provider"
        );

        let output = ctx
            .run(self.runner.run(&self.program, &args, &self.workspace, &prompt))
            .await?;

        parse_cli_output(&output)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "Claude CLI"
    }
}

// ─────────────────────────────────────────────
// Prompt rendering
// ─────────────────────────────────────────────

fn render_system_prompt(messages: &[Message], tools: &[ToolDefinition]) -> String {
    let mut parts: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::System && !m.content.is_empty())
        .map(|m| m.content.clone())
        .collect();

    if !tools.is_empty() {
        let mut section = String::from(
            "## Available Tools\n\n\
             To call tools, reply with only this JSON and nothing else:\n\
             {\"tool_calls\":[{\"id\":\"call_1\",\"type\":\"function\",\
             \"function\":{\"name\":\"tool_name\",\"arguments\":\"{\\\"key\\\":\\\"value\\\"}\"}}]}\n",
        );
        for tool in tools {
            section.push_str(&format!(
                "\n### {}\n{}\nParameters: {}\n",
                tool.function.name, tool.function.description, tool.function.parameters
            ));
        }
        parts.push(section);
    }

    parts.join("\n\n")
}

fn render_prompt(messages: &[Message]) -> String {
    let turns: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();

    // A lone user turn is passed through untouched.
    if let [only] = turns.as_slice() {
        if only.role == Role::User {
            return only.content.clone();
        }
    }

    let mut out = String::new();
    for msg in turns {
        match msg.role {
            Role::User => out.push_str(&format!("User: {}\n", msg.content)),
            Role::Assistant => {
                if !msg.content.is_empty() {
                    out.push_str(&format!("Assistant: {}\n", msg.content));
                }
                for call in &msg.tool_calls {
                    out.push_str(&format!(
                        "Assistant called tool {} ({}) with {}\n",
                        call.name,
                        call.id,
                        Value::Object(call.arguments.clone())
                    ));
                }
            }
            Role::Tool => out.push_str(&format!(
                "Tool result ({}): {}\n",
                msg.tool_call_id.as_deref().unwrap_or("unknown"),
                msg.content
            )),
            Role::System => {}
        }
    }
    out
}

// ─────────────────────────────────────────────
// Output parsing
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CliResult {
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    result: String,
    #[serde(default)]
    usage: Option<CliUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct CliUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    cache_creation_input_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: u32,
}

fn parse_cli_output(output: &CommandOutput) -> Result<LlmResponse, ProviderError> {
    let stdout = output.stdout.trim();

    if !output.status.success() && stdout.is_empty() {
        return Err(ProviderError::Cli(format!(
            "claude exited with {}: {}",
            output.status,
            output.stderr.trim()
        )));
    }

    let parsed: CliResult = serde_json::from_str(stdout).map_err(|e| {
        ProviderError::Cli(format!(
            "unexpected CLI output ({e}): {}",
            llmux_core::utils::truncate_string(stdout, 200)
        ))
    })?;

    if parsed.is_error || !output.status.success() {
        return Err(ProviderError::Cli(parsed.result));
    }

    let (content, tool_calls) = extract_tool_calls(&parsed.result);
    let finish_reason = if tool_calls.is_empty() { "stop" } else { "tool_calls" };

    let usage = parsed.usage.map(|u| {
        let prompt_tokens = u
            .input_tokens
            .saturating_add(u.cache_creation_input_tokens)
            .saturating_add(u.cache_read_input_tokens);
        UsageInfo {
            prompt_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: prompt_tokens.saturating_add(u.output_tokens),
        }
    });

    Ok(LlmResponse {
        content,
        tool_calls,
        finish_reason: finish_reason.to_string(),
        usage,
    })
}

/// Split an inline `{"tool_calls": [...]}` block out of `text`.
///
/// Returns the remaining text and the parsed calls. Text without a
/// well-formed block comes back unchanged.
fn extract_tool_calls(text: &str) -> (String, Vec<ToolCall>) {
    let Some(start) = text.find("{\"tool_calls\"") else {
        return (text.trim().to_string(), Vec::new());
    };
    let Some(end) = matching_brace(text, start) else {
        return (text.trim().to_string(), Vec::new());
    };

    let block: Value = match serde_json::from_str(&text[start..=end]) {
        Ok(v) => v,
        Err(_) => return (text.trim().to_string(), Vec::new()),
    };

    let calls: Vec<ToolCall> = block["tool_calls"]
        .as_array()
        .map(|arr| arr.iter().enumerate().filter_map(|(i, c)| tool_call_from_value(i, c)).collect())
        .unwrap_or_default();

    let remaining = format!("{}{}", &text[..start], &text[end + 1..]);
    (remaining.trim().to_string(), calls)
}

fn tool_call_from_value(index: usize, value: &Value) -> Option<ToolCall> {
    let function = value.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => parse_tool_arguments(&name, raw),
        Some(Value::Object(map)) => map.clone(),
        _ => ToolArguments::new(),
    };
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("call_{}", index + 1));
    Some(ToolCall::new(id, name, arguments))
}

/// Byte index of the brace closing the object opened at `start`.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
