//! Claude-OAuth backend: Anthropic Messages API with an OAuth bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use llmux_core::types::{LlmResponse, Message, Role, ToolCall, ToolDefinition, UsageInfo};

use crate::auth::TokenSource;
use crate::context::RequestContext;
use crate::error::ProviderError;
use crate::traits::{ChatOptions, LlmProvider};
use crate::transport;

pub const CLAUDE_AUTH_API_BASE: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_OAUTH_BETA: &str = "oauth-2025-04-20";
pub const CLAUDE_AUTH_DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// `max_tokens` is mandatory on this API.
const DEFAULT_MAX_TOKENS: u32 = 4096;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    /// Thinking and other block types we don't surface.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ─────────────────────────────────────────────
// ClaudeAuthProvider
// ─────────────────────────────────────────────

pub struct ClaudeAuthProvider {
    client: reqwest::Client,
    api_base: String,
    default_model: String,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for ClaudeAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAuthProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ClaudeAuthProvider {
    pub fn new(tokens: Arc<dyn TokenSource>, default_model: &str) -> Result<Self, ProviderError> {
        let default_model = if default_model.is_empty() {
            CLAUDE_AUTH_DEFAULT_MODEL
        } else {
            default_model
        };
        Ok(ClaudeAuthProvider {
            client: transport::build_client(None)?,
            api_base: CLAUDE_AUTH_API_BASE.to_string(),
            default_model: default_model.to_string(),
            tokens,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl LlmProvider for ClaudeAuthProvider {
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError> {
        let credential = self.tokens.credential("anthropic")?;
        let model = match model.strip_prefix("anthropic/").unwrap_or(model) {
            "" => self.default_model.as_str(),
            m => m,
        };

        let (system, messages) = convert_messages(messages);
        let body = MessagesRequest {
            model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            tools: tools
                .iter()
                .map(|t| AnthropicTool {
                    name: &t.function.name,
                    description: &t.function.description,
                    input_schema: &t.function.parameters,
                })
                .collect(),
            temperature: options.temperature,
        };

        debug!(provider = "claude-auth", model, tools = tools.len(), "Calling LLM");

        let request = self
            .client
            .post(transport::endpoint_url(&self.api_base, "messages"))
            .bearer_auth(&credential.access_token)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", ANTHROPIC_OAUTH_BETA)
            .json(&body);

        let text = transport::send(ctx, "claude-auth", request).await?;
        let resp: MessagesResponse = transport::decode_json("claude-auth", &text)?;
        Ok(convert_response(resp))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "Claude (OAuth)"
    }
}

// ─────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────

/// Split out the system prompt and fold the rest into alternating turns.
/// Tool results travel as `user` turns.
fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System && !m.content.is_empty())
        .map(|m| m.content.as_str())
        .collect();

    let mut out: Vec<AnthropicMessage> = Vec::new();
    for msg in messages {
        let (role, blocks) = match msg.role {
            Role::System => continue,
            Role::User => ("user", vec![ContentBlock::Text {
                text: msg.content.clone(),
            }]),
            Role::Tool => ("user", vec![ContentBlock::ToolResult {
                tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                content: msg.content.clone(),
            }]),
            Role::Assistant => {
                let mut blocks = Vec::new();
                if !msg.content.is_empty() {
                    blocks.push(ContentBlock::Text {
                        text: msg.content.clone(),
                    });
                }
                blocks.extend(msg.tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: Value::Object(call.arguments.clone()),
                }));
                ("assistant", blocks)
            }
        };

        match out.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => out.push(AnthropicMessage { role, content: blocks }),
        }
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, out)
}

fn convert_response(resp: MessagesResponse) -> LlmResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in resp.content {
        match block {
            ContentBlock::Text { text } => content.push_str(&text),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = match input {
                    Value::Object(map) => map,
                    _ => Default::default(),
                };
                tool_calls.push(ToolCall::new(id, name, arguments));
            }
            ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
        }
    }

    let finish_reason = match resp.stop_reason.as_deref() {
        Some("tool_use") => "tool_calls".to_string(),
        Some("max_tokens") => "length".to_string(),
        Some("end_turn") | Some("stop_sequence") | None => "stop".to_string(),
        Some(other) => other.to_string(),
    };

    LlmResponse {
        content,
        tool_calls,
        finish_reason,
        usage: resp.usage.map(|u| UsageInfo {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens.saturating_add(u.output_tokens),
        }),
    }
}
