//! Codex-OAuth backend: OpenAI Responses API with a ChatGPT OAuth token.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use llmux_core::types::{LlmResponse, Message, Role, ToolCall, ToolDefinition, UsageInfo};

use crate::auth::TokenSource;
use crate::context::RequestContext;
use crate::error::ProviderError;
use crate::http_provider::parse_tool_arguments;
use crate::traits::{ChatOptions, LlmProvider};
use crate::transport;

pub const CODEX_AUTH_API_BASE: &str = "https://chatgpt.com/backend-api/codex";
pub const CODEX_AUTH_DEFAULT_MODEL: &str = "gpt-5";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ResponsesTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    store: bool,
}

#[derive(Debug, Serialize)]
struct ResponsesTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputItem {
    Message {
        role: &'static str,
        content: Vec<InputContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    OutputText { text: String },
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
    #[serde(default)]
    usage: Option<ResponsesUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    /// Reasoning summaries and other item kinds.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

// ─────────────────────────────────────────────
// CodexAuthProvider
// ─────────────────────────────────────────────

pub struct CodexAuthProvider {
    client: reqwest::Client,
    api_base: String,
    default_model: String,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for CodexAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodexAuthProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl CodexAuthProvider {
    pub fn new(tokens: Arc<dyn TokenSource>, default_model: &str) -> Result<Self, ProviderError> {
        let default_model = if default_model.is_empty() {
            CODEX_AUTH_DEFAULT_MODEL
        } else {
            default_model
        };
        Ok(CodexAuthProvider {
            client: transport::build_client(None)?,
            api_base: CODEX_AUTH_API_BASE.to_string(),
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
impl LlmProvider for CodexAuthProvider {
    /// Sampling options are not forwarded; the Codex backend only accepts
    /// its own defaults.
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        _options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError> {
        let credential = self.tokens.credential("openai")?;
        let model = match model.strip_prefix("openai/").unwrap_or(model) {
            "" => self.default_model.as_str(),
            m => m,
        };

        let (instructions, input) = convert_messages(messages);
        let body = ResponsesRequest {
            model,
            instructions,
            input,
            tools: tools
                .iter()
                .map(|t| ResponsesTool {
                    tool_type: "function",
                    name: &t.function.name,
                    description: &t.function.description,
                    parameters: &t.function.parameters,
                })
                .collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            store: false,
        };

        debug!(provider = "codex-auth", model, tools = tools.len(), "Calling LLM");

        let mut request = self
            .client
            .post(transport::endpoint_url(&self.api_base, "responses"))
            .bearer_auth(&credential.access_token)
            .json(&body);
        if let Some(account_id) = credential.account_id.as_deref() {
            request = request.header("chatgpt-account-id", account_id);
        }

        let text = transport::send(ctx, "codex-auth", request).await?;
        let resp: ResponsesResponse = transport::decode_json("codex-auth", &text)?;
        Ok(convert_response(resp))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "Codex (OAuth)"
    }
}

// ─────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────

fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<InputItem>) {
    let mut instructions: Vec<&str> = Vec::new();
    let mut input = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => {
                if !msg.content.is_empty() {
                    instructions.push(&msg.content);
                }
            }
            Role::User => input.push(InputItem::Message {
                role: "user",
                content: vec![InputContent::InputText {
                    text: msg.content.clone(),
                }],
            }),
            Role::Assistant => {
                if !msg.content.is_empty() {
                    input.push(InputItem::Message {
                        role: "assistant",
                        content: vec![InputContent::OutputText {
                            text: msg.content.clone(),
                        }],
                    });
                }
                input.extend(msg.tool_calls.iter().map(|call| InputItem::FunctionCall {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: Value::Object(call.arguments.clone()).to_string(),
                }));
            }
            Role::Tool => input.push(InputItem::FunctionCallOutput {
                call_id: msg.tool_call_id.clone().unwrap_or_default(),
                output: msg.content.clone(),
            }),
        }
    }

    let instructions = (!instructions.is_empty()).then(|| instructions.join("\n\n"));
    (instructions, input)
}

fn convert_response(resp: ResponsesResponse) -> LlmResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for item in resp.output {
        match item {
            OutputItem::Message { content: parts } => {
                for part in parts {
                    if let OutputContent::OutputText { text } = part {
                        content.push_str(&text);
                    }
                }
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                let args = parse_tool_arguments(&name, &arguments);
                tool_calls.push(ToolCall::new(call_id, name, args));
            }
            OutputItem::Other => {}
        }
    }

    let truncated = resp.status.as_deref() == Some("incomplete")
        && resp
            .incomplete_details
            .and_then(|d| d.reason)
            .map_or(false, |r| r == "max_output_tokens");

    let finish_reason = if !tool_calls.is_empty() {
        "tool_calls"
    } else if truncated {
        "length"
    } else {
        "stop"
    };

    LlmResponse {
        content,
        tool_calls,
        finish_reason: finish_reason.to_string(),
        usage: resp.usage.map(|u| UsageInfo {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: if u.total_tokens > 0 {
                u.total_tokens
            } else {
                u.input_tokens.saturating_add(u.output_tokens)
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthCredential, StaticToken};
    use llmux_core::types::ToolArguments;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base: &str) -> CodexAuthProvider {
        let mut cred = AuthCredential::new("codex-tok");
        cred.account_id = Some("acct_42".into());
        CodexAuthProvider::new(Arc::new(StaticToken(cred)), "")
            .unwrap()
            .with_api_base(base)
    }

    #[test]
    fn test_convert_messages_items() {
        let mut args = ToolArguments::new();
        args.insert("path".into(), json!("a.txt"));
        let messages = vec![
            Message::system("You are a coder."),
            Message::user("Read a.txt"),
            Message::assistant_tool_calls(vec![ToolCall::new("fc_1", "read_file", args)]),
            Message::tool_result("fc_1", "hello"),
        ];

        let (instructions, input) = convert_messages(&messages);
        assert_eq!(instructions.as_deref(), Some("You are a coder."));

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json[0]["type"], "message");
        assert_eq!(json[0]["content"][0]["type"], "input_text");
        assert_eq!(json[1]["type"], "function_call");
        assert_eq!(json[1]["call_id"], "fc_1");
        assert_eq!(json[1]["arguments"], "{\"path\":\"a.txt\"}");
        assert_eq!(json[2], json!({"type": "function_call_output", "call_id": "fc_1", "output": "hello"}));
    }

    #[test]
    fn test_incomplete_response_is_length() {
        let resp: ResponsesResponse = serde_json::from_value(json!({
            "status": "incomplete",
            "incomplete_details": {"reason": "max_output_tokens"},
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [{"type": "output_text", "text": "partial"}]}
            ]
        }))
        .unwrap();
        let out = convert_response(resp);
        assert_eq!(out.content, "partial");
        assert_eq!(out.finish_reason, "length");
    }

    #[tokio::test]
    async fn test_chat_function_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("Authorization", "Bearer codex-tok"))
            .and(header("chatgpt-account-id", "acct_42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "output": [{
                    "type": "function_call",
                    "id": "fc_item",
                    "call_id": "call_1",
                    "name": "get_weather",
                    "arguments": "{\"city\":\"SF\"}"
                }],
                "usage": {"input_tokens": 30, "output_tokens": 9, "total_tokens": 39}
            })))
            .mount(&server)
            .await;

        let tool = ToolDefinition::new("get_weather", "Weather", json!({"type": "object"}));
        let resp = provider(&server.uri())
            .chat(
                &RequestContext::new(),
                &[Message::system("sys"), Message::user("SF?")],
                &[tool],
                "openai/gpt-5",
                &ChatOptions::default().with_temperature(0.2),
            )
            .await
            .unwrap();

        assert_eq!(resp.finish_reason, "tool_calls");
        assert_eq!(resp.tool_calls[0].id, "call_1");
        assert_eq!(resp.tool_calls[0].arguments["city"], "SF");
        assert_eq!(resp.usage.unwrap().total_tokens, 39);

        let requests = server.received_requests().await.unwrap();
        let body: Value = requests[0].body_json().unwrap();
        assert_eq!(body["model"], "gpt-5");
        assert_eq!(body["store"], false);
        assert_eq!(body["instructions"], "sys");
        assert_eq!(body["tools"][0]["name"], "get_weather");
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_chat_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .chat(&RequestContext::new(), &[Message::user("hi")], &[], "", &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 429, .. }));
    }
}
