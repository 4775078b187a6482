//! Generic HTTP-based LLM provider for OpenAI-compatible APIs.
//!
//! Pure structural translation between the normalized chat model and the
//! wire codec in [`crate::openai_compat`]. No per-model quirks live here.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use llmux_core::types::{
    LlmResponse, Message, ToolArguments, ToolCall, ToolDefinition, UsageInfo,
};

use crate::context::RequestContext;
use crate::error::ProviderError;
use crate::openai_compat::{
    OpenAiCompatClient, WireFunctionCall, WireMessage, WireResponse, WireTool, WireToolCall,
    WireToolFunction,
};
use crate::registry;
use crate::selection::ProviderSelection;
use crate::traits::{ChatOptions, LlmProvider};
use crate::transport;

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A provider that talks to any OpenAI-compatible HTTP API.
#[derive(Debug)]
pub struct HttpProvider {
    client: OpenAiCompatClient,
    /// Default model for this provider instance.
    default_model: String,
    display_name: &'static str,
}

impl HttpProvider {
    /// Build from a resolved selection. Base URL, key and proxy are fixed here.
    pub fn from_selection(selection: &ProviderSelection) -> Result<Self, ProviderError> {
        let spec = selection.vendor.and_then(registry::find_by_name);
        let display_name = spec.map_or("OpenAI-compatible", |s| s.display_name);
        let label = spec.map_or("openai-compat", |s| s.name);

        let client = OpenAiCompatClient::new(
            &selection.api_key,
            &selection.api_base,
            selection.proxy.as_deref(),
        )?
        .with_extra_headers(transport::header_map(&selection.extra_headers))
        .with_label(label);

        Ok(HttpProvider {
            client,
            default_model: selection.model.clone(),
            display_name,
        })
    }

    pub fn api_base(&self) -> &str {
        self.client.api_base()
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError> {
        let wire_messages: Vec<WireMessage> = messages.iter().map(to_wire_message).collect();
        let wire_tools: Vec<WireTool> = tools.iter().map(to_wire_tool).collect();

        let response = self
            .client
            .send(ctx, &wire_messages, &wire_tools, model, options)
            .await?;

        Ok(from_wire_response(response))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        self.display_name
    }
}

// ─────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────

pub(crate) fn to_wire_message(msg: &Message) -> WireMessage {
    WireMessage {
        role: msg.role.as_str().to_string(),
        content: msg.content.clone(),
        tool_calls: msg.tool_calls.iter().map(to_wire_tool_call).collect(),
        tool_call_id: msg.tool_call_id.clone(),
    }
}

fn to_wire_tool_call(call: &ToolCall) -> WireToolCall {
    WireToolCall {
        id: call.id.clone(),
        call_type: call.call_type.clone(),
        function: WireFunctionCall {
            name: call.name.clone(),
            arguments: Value::Object(call.arguments.clone()).to_string(),
        },
    }
}

pub(crate) fn to_wire_tool(def: &ToolDefinition) -> WireTool {
    WireTool {
        tool_type: def.tool_type.clone(),
        function: WireToolFunction {
            name: def.function.name.clone(),
            description: def.function.description.clone(),
            parameters: def.function.parameters.clone(),
        },
    }
}

fn from_wire_tool_call(call: WireToolCall) -> ToolCall {
    let arguments = parse_tool_arguments(&call.function.name, &call.function.arguments);
    ToolCall {
        id: call.id,
        call_type: call.call_type,
        name: call.function.name,
        arguments,
    }
}

pub(crate) fn from_wire_response(resp: WireResponse) -> LlmResponse {
    LlmResponse {
        content: resp.content,
        tool_calls: resp.tool_calls.into_iter().map(from_wire_tool_call).collect(),
        finish_reason: resp.finish_reason,
        usage: resp.usage.map(|u| UsageInfo {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    }
}

/// Decode a JSON-encoded argument string. Anything that is not a JSON object
/// yields an empty mapping.
pub fn parse_tool_arguments(tool: &str, raw: &str) -> ToolArguments {
    if raw.trim().is_empty() {
        return ToolArguments::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(tool, kind = json_kind(&other), "tool arguments are not an object");
            ToolArguments::new()
        }
        Err(e) => {
            warn!(tool, error = %e, "malformed tool arguments");
            ToolArguments::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
