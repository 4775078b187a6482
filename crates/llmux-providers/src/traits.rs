//! LLM Provider trait — the single capability every backend exposes.

use async_trait::async_trait;
use llmux_core::config::AgentDefaults;
use llmux_core::types::{LlmResponse, Message, ToolDefinition};

use crate::context::RequestContext;
use crate::error::ProviderError;

/// Sampling and limit options for one chat call.
///
/// Unset fields are left out of the request entirely. Per-model quirks
/// (parameter renames, forced values) are applied by the wire codec, not here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatOptions {
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: Option<f64>,
}

impl ChatOptions {
    /// Options taken from the configured agent defaults.
    pub fn from_defaults(defaults: &AgentDefaults) -> Self {
        ChatOptions {
            max_tokens: Some(defaults.max_tokens),
            temperature: Some(defaults.temperature),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait that all LLM backends implement.
///
/// Implementations hold only immutable configuration plus a shareable client,
/// so `chat` may be called concurrently on the same instance.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one chat request.
    ///
    /// # Arguments
    /// * `ctx`      — Cancellation / deadline for this call.
    /// * `messages` — Conversation history.
    /// * `tools`    — Tools the model may call (empty = no tool calling).
    /// * `model`    — Model identifier (e.g. `"glm-4.7"`, `"moonshot/kimi-k2.5"`).
    /// * `options`  — Temperature, max tokens.
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError>;

    /// Model used when the caller has no preference. Empty if the backend has none.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_defaults() {
        let defaults = AgentDefaults::default();
        let opts = ChatOptions::from_defaults(&defaults);
        assert_eq!(opts.max_tokens, Some(8192));
        assert_eq!(opts.temperature, Some(0.7));
    }

    #[test]
    fn test_options_builders() {
        let opts = ChatOptions::default()
            .with_max_tokens(256)
            .with_temperature(0.2);
        assert_eq!(opts.max_tokens, Some(256));
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(ChatOptions::default().max_tokens, None);
    }
}
