//! GitHub Copilot backend.
//!
//! Talks to a locally running Copilot bridge that exposes the
//! OpenAI-compatible chat-completions protocol.

use async_trait::async_trait;

use llmux_core::types::{LlmResponse, Message, ToolDefinition};

use crate::context::RequestContext;
use crate::error::ProviderError;
use crate::http_provider::{to_wire_message, to_wire_tool};
use crate::openai_compat::OpenAiCompatClient;
use crate::selection::{ProviderSelection, COPILOT_DEFAULT_API_BASE};
use crate::traits::{ChatOptions, LlmProvider};
use crate::{http_provider, transport};

/// Model the bridge serves when the caller has none configured.
pub const COPILOT_DEFAULT_MODEL: &str = "gpt-4.1";

#[derive(Debug)]
pub struct CopilotProvider {
    client: OpenAiCompatClient,
    default_model: String,
}

impl CopilotProvider {
    pub fn from_selection(selection: &ProviderSelection) -> Result<Self, ProviderError> {
        let base = if selection.api_base.trim().is_empty() {
            COPILOT_DEFAULT_API_BASE
        } else {
            selection.api_base.as_str()
        };
        // `localhost:4321` style addresses get an explicit scheme.
        let api_base = transport::endpoint_url(base, "");
        let api_base = api_base.trim_end_matches('/');

        let client = OpenAiCompatClient::new(&selection.api_key, api_base, None)?
            .with_label("github-copilot");

        let default_model = if selection.model.is_empty() {
            COPILOT_DEFAULT_MODEL.to_string()
        } else {
            selection.model.clone()
        };

        Ok(CopilotProvider {
            client,
            default_model,
        })
    }

    pub fn api_base(&self) -> &str {
        self.client.api_base()
    }
}

#[async_trait]
impl LlmProvider for CopilotProvider {
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError> {
        let model = if model.is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        let wire_messages: Vec<_> = messages.iter().map(to_wire_message).collect();
        let wire_tools: Vec<_> = tools.iter().map(to_wire_tool).collect();

        let response = self
            .client
            .send(ctx, &wire_messages, &wire_tools, model, options)
            .await?;
        Ok(http_provider::from_wire_response(response))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "GitHub Copilot"
    }
}
