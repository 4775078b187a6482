//! Conversation state shared by one-shot and REPL modes.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use llmux_core::types::{LlmResponse, Message};
use llmux_providers::{ChatOptions, LlmProvider, ProviderError, RequestContext};

/// A running conversation against one provider.
pub struct ChatSession<P> {
    provider: P,
    model: String,
    options: ChatOptions,
    timeout: Option<Duration>,
    history: Vec<Message>,
}

impl<P: LlmProvider> ChatSession<P> {
    pub fn new(provider: P, model: impl Into<String>, options: ChatOptions) -> Self {
        ChatSession {
            provider,
            model: model.into(),
            options,
            timeout: None,
            history: Vec::new(),
        }
    }

    /// Per-request deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
            self.history.insert(0, Message::system(prompt));
        }
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drop every turn except the system prompt.
    pub fn reset(&mut self) {
        self.history.retain(|m| m.role == llmux_core::types::Role::System);
    }

    /// Send one user turn. On failure the turn is rolled back so the
    /// history stays well-formed.
    pub async fn send(
        &mut self,
        input: &str,
        cancel: CancellationToken,
    ) -> Result<LlmResponse, ProviderError> {
        let mut ctx = RequestContext::with_token(cancel);
        if let Some(timeout) = self.timeout {
            ctx = ctx.with_timeout(timeout);
        }

        self.history.push(Message::user(input));
        debug!(turns = self.history.len(), model = %self.model, "sending turn");

        let result = self
            .provider
            .chat(&ctx, &self.history, &[], &self.model, &self.options)
            .await;

        match &result {
            Ok(response) => self.history.push(Message {
                tool_calls: response.tool_calls.clone(),
                ..Message::assistant(response.content.clone())
            }),
            Err(_) => {
                self.history.pop();
            }
        }
        result
    }
}
