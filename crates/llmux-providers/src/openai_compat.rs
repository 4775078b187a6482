//! Wire codec for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Owns the JSON schema and every per-model quirk:
//!
//! - token limit sent as `max_completion_tokens` for models that reject `max_tokens`
//! - known vendor namespaces stripped from the `model` field
//! - forced parameter values (e.g. Kimi K2 temperature)
//!
//! Tool-call arguments stay JSON-encoded strings at this layer; decoding them
//! is the caller's job.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ProviderError;
use crate::registry::{self, TokenLimitParam};
use crate::traits::ChatOptions;
use crate::transport;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

/// A chat message in the OpenAI wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool call in the OpenAI wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: WireFunctionCall,
}

/// Function name plus JSON-encoded arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A tool spec in the OpenAI wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: WireToolFunction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Token counters as reported by the endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Decoded first choice of a completion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WireResponse {
    pub content: String,
    pub tool_calls: Vec<WireToolCall>,
    pub finish_reason: String,
    pub usage: Option<WireUsage>,
}

fn function_type() -> String {
    "function".to_string()
}

// ─────────────────────────────────────────────
// Request / response bodies
// ─────────────────────────────────────────────

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [WireTool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

/// Build the request body for `model` on the endpoint at `api_base`,
/// applying every registry quirk.
pub fn build_request<'a>(
    model: &'a str,
    api_base: &str,
    messages: &'a [WireMessage],
    tools: &'a [WireTool],
    options: &ChatOptions,
) -> ChatCompletionRequest<'a> {
    let wire_model = registry::wire_model_name(model, api_base);

    let (max_tokens, max_completion_tokens) = match options.max_tokens {
        Some(limit) => match registry::token_limit_param(wire_model) {
            TokenLimitParam::MaxTokens => (Some(limit), None),
            TokenLimitParam::MaxCompletionTokens => (None, Some(limit)),
        },
        None => (None, None),
    };

    let temperature = options
        .temperature
        .map(|t| registry::apply_model_overrides(wire_model, t));

    let has_tools = !tools.is_empty();
    ChatCompletionRequest {
        model: wire_model,
        messages,
        tools: has_tools.then_some(tools),
        tool_choice: has_tools.then_some("auto"),
        max_tokens,
        max_completion_tokens,
        temperature,
    }
}

/// Decode a `/chat/completions` body. No choices is an empty result, not an error.
pub fn parse_response(provider: &str, body: &str) -> Result<WireResponse, ProviderError> {
    let resp: ChatCompletionResponse = transport::decode_json(provider, body)?;

    let Some(choice) = resp.choices.into_iter().next() else {
        return Ok(WireResponse {
            finish_reason: "stop".to_string(),
            usage: resp.usage,
            ..Default::default()
        });
    };

    Ok(WireResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
        finish_reason: choice.finish_reason.unwrap_or_default(),
        usage: resp.usage,
    })
}

// ─────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────

/// Client for one OpenAI-compatible endpoint.
pub struct OpenAiCompatClient {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// Bearer credential. Not sent when empty.
    api_key: String,
    extra_headers: HeaderMap,
    /// Name used in logs.
    label: String,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("api_base", &self.api_base)
            .field("label", &self.label)
            .finish()
    }
}

impl OpenAiCompatClient {
    /// Create a client; `proxy` is fixed for the client's lifetime.
    pub fn new(api_key: &str, api_base: &str, proxy: Option<&str>) -> Result<Self, ProviderError> {
        Ok(OpenAiCompatClient {
            client: transport::build_client(proxy)?,
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
            extra_headers: HeaderMap::new(),
            label: "openai-compat".to_string(),
        })
    }

    pub fn with_extra_headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers = headers;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn completions_url(&self) -> String {
        transport::endpoint_url(&self.api_base, "chat/completions")
    }

    /// POST one chat completion and decode the first choice.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        messages: &[WireMessage],
        tools: &[WireTool],
        model: &str,
        options: &ChatOptions,
    ) -> Result<WireResponse, ProviderError> {
        let body = build_request(model, &self.api_base, messages, tools, options);

        debug!(
            provider = %self.label,
            model = body.model,
            messages = messages.len(),
            tools = tools.len(),
            "Calling LLM"
        );

        let mut request = self
            .client
            .post(self.completions_url())
            .headers(self.extra_headers.clone())
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let text = transport::send(ctx, &self.label, request).await?;
        let response = parse_response(&self.label, &text)?;

        debug!(
            provider = %self.label,
            content_len = response.content.len(),
            tool_calls = response.tool_calls.len(),
            finish_reason = %response.finish_reason,
            "LLM response received"
        );

        Ok(response)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user(text: &str) -> Vec<WireMessage> {
        vec![WireMessage {
            role: "user".into(),
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }]
    }

    fn ok_body() -> Value {
        json!({
            "choices": [{
                "message": { "content": "ok" },
                "finish_reason": "stop"
            }]
        })
    }

    async fn last_body(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        requests.last().unwrap().body_json().unwrap()
    }

    // ── build_request ──

    #[test]
    fn test_build_request_default_token_param() {
        let msgs = user("hi");
        let opts = ChatOptions::default().with_max_tokens(512).with_temperature(0.4);
        let body = serde_json::to_value(build_request("gpt-4o", "https://api.openai.com/v1", &msgs, &[], &opts)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["temperature"], 0.4);
        assert!(body.get("max_completion_tokens").is_none());
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_build_request_omits_unset_options() {
        let msgs = user("hi");
        let body = serde_json::to_value(build_request("gpt-4o", "", &msgs, &[], &ChatOptions::default())).unwrap();
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_build_request_with_tools_sets_tool_choice() {
        let msgs = user("weather?");
        let tools = vec![WireTool {
            tool_type: "function".into(),
            function: WireToolFunction {
                name: "get_weather".into(),
                description: "Weather lookup".into(),
                parameters: json!({"type": "object"}),
            },
        }];
        let body = serde_json::to_value(build_request("gpt-4o", "", &msgs, &tools, &ChatOptions::default())).unwrap();
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "get_weather");
    }

    #[test]
    fn test_wire_message_serialization() {
        let msg = WireMessage {
            role: "tool".into(),
            content: "72F".into(),
            tool_calls: Vec::new(),
            tool_call_id: Some("call_1".into()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    // ── parse_response ──

    #[test]
    fn test_parse_response_empty_choices() {
        let resp = parse_response("test", r#"{"choices": []}"#).unwrap();
        assert!(resp.content.is_empty());
        assert!(resp.tool_calls.is_empty());
        assert_eq!(resp.finish_reason, "stop");
        assert!(resp.usage.is_none());
    }

    #[test]
    fn test_parse_response_null_content_and_missing_usage() {
        let body = r#"{"choices": [{"message": {"content": null, "tool_calls": null}, "finish_reason": "stop"}]}"#;
        let resp = parse_response("test", body).unwrap();
        assert!(resp.content.is_empty());
        assert!(resp.usage.is_none());
    }

    #[test]
    fn test_parse_response_invalid_json() {
        let err = parse_response("test", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_uses_max_completion_tokens_for_glm() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("key", &server.uri(), None).unwrap();
        let opts = ChatOptions::default().with_max_tokens(1234);
        client
            .send(&RequestContext::new(), &user("hi"), &[], "glm-4.7", &opts)
            .await
            .unwrap();

        let body = last_body(&server).await;
        assert_eq!(body["max_completion_tokens"], 1234);
        assert!(body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_strips_moonshot_prefix_and_forces_kimi_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("key", &server.uri(), None).unwrap();
        let opts = ChatOptions::default().with_temperature(0.3);
        client
            .send(&RequestContext::new(), &user("hi"), &[], "moonshot/kimi-k2.5", &opts)
            .await
            .unwrap();

        let body = last_body(&server).await;
        assert_eq!(body["model"], "kimi-k2.5");
        assert_eq!(body["temperature"], 1.0);
    }

    #[tokio::test]
    async fn test_parses_tool_calls_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": "",
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "get_weather",
                                "arguments": "{\"city\":\"SF\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {
                    "prompt_tokens": 10,
                    "completion_tokens": 5,
                    "total_tokens": 15
                }
            })))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("key", &server.uri(), None).unwrap();
        let resp = client
            .send(&RequestContext::new(), &user("hi"), &[], "gpt-4o", &ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].function.name, "get_weather");
        assert_eq!(resp.tool_calls[0].function.arguments, "{\"city\":\"SF\"}");
        assert_eq!(resp.finish_reason, "tool_calls");
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("key", &server.uri(), None).unwrap();
        let err = client
            .send(&RequestContext::new(), &user("hi"), &[], "gpt-4o", &ChatOptions::default())
            .await
            .unwrap_err();

        match err {
            ProviderError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad request");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_bearer_when_key_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("", &server.uri(), None).unwrap();
        client
            .send(&RequestContext::new(), &user("hi"), &[], "local", &ChatOptions::default())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_network_error_is_transport() {
        let client = OpenAiCompatClient::new("key", "http://127.0.0.1:1", None).unwrap();
        let err = client
            .send(&RequestContext::new(), &user("hi"), &[], "gpt-4o", &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body())
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("key", &server.uri(), None).unwrap();
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let err = client
            .send(&ctx, &user("hi"), &[], "gpt-4o", &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DeadlineExceeded));
    }
}
