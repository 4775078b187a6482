//! Normalized chat model shared by every llmux backend.
//!
//! These types are backend-neutral: each provider translates them to and from
//! its own wire schema. Tool-call arguments are always a parsed JSON object
//! here, even though OpenAI-style endpoints carry them as an encoded string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed tool-call arguments (`key → value`).
pub type ToolArguments = Map<String, Value>;

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Wire name of the role (`"system"`, `"user"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn in a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Text content. Empty for assistant turns that only carry tool calls.
    #[serde(default)]
    pub content: String,
    /// Tool calls issued by the assistant in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `Role::Tool` messages: the id of the tool call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message carrying tool calls (no text content).
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message {
            tool_calls,
            ..Self::new(Role::Assistant, "")
        }
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique id, echoed back in the matching tool result.
    pub id: String,
    /// Always `"function"` for current backends.
    #[serde(rename = "type")]
    pub call_type: String,
    /// Name of the tool to run.
    pub name: String,
    /// Parsed arguments.
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Create a function tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            name: name.into(),
            arguments,
        }
    }
}

/// A callable tool exposed to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Name, description, and JSON-schema parameters of a function tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a function tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

// ─────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────

/// Normalized result of one chat request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    /// Assistant text; empty when the model only requested tools.
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped (`"stop"`, `"tool_calls"`, `"length"`, ...).
    pub finish_reason: String,
    /// `None` when the backend does not report usage.
    pub usage: Option<UsageInfo>,
}

impl LlmResponse {
    /// Whether the model requested any tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token accounting for one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
