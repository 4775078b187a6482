//! Provider factory — configuration in, ready-to-use backend out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use llmux_core::config::Config;
use llmux_core::types::{LlmResponse, Message, ToolDefinition};

use crate::auth::{AuthStore, TokenSource};
use crate::claude_auth::ClaudeAuthProvider;
use crate::claude_cli::ClaudeCliProvider;
use crate::codex_auth::CodexAuthProvider;
use crate::context::RequestContext;
use crate::copilot::CopilotProvider;
use crate::error::ProviderError;
use crate::http_provider::HttpProvider;
use crate::selection::{resolve_provider_selection, ProviderKind, ProviderSelection};
use crate::traits::{ChatOptions, LlmProvider};

/// The closed set of backends.
#[derive(Debug)]
pub enum Provider {
    ClaudeCli(ClaudeCliProvider),
    GitHubCopilot(CopilotProvider),
    HttpCompat(HttpProvider),
    ClaudeAuth(ClaudeAuthProvider),
    CodexAuth(CodexAuthProvider),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::ClaudeCli(_) => ProviderKind::ClaudeCli,
            Provider::GitHubCopilot(_) => ProviderKind::GitHubCopilot,
            Provider::HttpCompat(_) => ProviderKind::HttpCompat,
            Provider::ClaudeAuth(_) => ProviderKind::ClaudeAuth,
            Provider::CodexAuth(_) => ProviderKind::CodexAuth,
        }
    }

    fn inner(&self) -> &dyn LlmProvider {
        match self {
            Provider::ClaudeCli(p) => p as &dyn LlmProvider,
            Provider::GitHubCopilot(p) => p,
            Provider::HttpCompat(p) => p,
            Provider::ClaudeAuth(p) => p,
            Provider::CodexAuth(p) => p,
        }
    }
}

#[async_trait]
impl LlmProvider for Provider {
    async fn chat(
        &self,
        ctx: &RequestContext,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: &ChatOptions,
    ) -> Result<LlmResponse, ProviderError> {
        self.inner().chat(ctx, messages, tools, model, options).await
    }

    fn default_model(&self) -> &str {
        self.inner().default_model()
    }

    fn display_name(&self) -> &str {
        self.inner().display_name()
    }
}

/// Resolve and build the backend for `config`.
///
/// OAuth backends read credentials from `~/.llmux/auth.json`. Selection
/// errors are returned unchanged.
pub fn create_provider(config: &Config) -> Result<Provider, ProviderError> {
    create_provider_with_tokens(config, Arc::new(AuthStore::default_location()))
}

/// Like [`create_provider`] with an explicit credential source.
pub fn create_provider_with_tokens(
    config: &Config,
    tokens: Arc<dyn TokenSource>,
) -> Result<Provider, ProviderError> {
    let selection = resolve_provider_selection(config)?;
    create_provider_from_selection(&selection, tokens)
}

/// Instantiate the backend named by an already-resolved selection.
pub fn create_provider_from_selection(
    selection: &ProviderSelection,
    tokens: Arc<dyn TokenSource>,
) -> Result<Provider, ProviderError> {
    let provider = match selection.kind {
        ProviderKind::ClaudeCli => Provider::ClaudeCli(ClaudeCliProvider::from_selection(selection)),
        ProviderKind::GitHubCopilot => {
            Provider::GitHubCopilot(CopilotProvider::from_selection(selection)?)
        }
        ProviderKind::HttpCompat => Provider::HttpCompat(HttpProvider::from_selection(selection)?),
        ProviderKind::ClaudeAuth => {
            Provider::ClaudeAuth(ClaudeAuthProvider::new(tokens, &selection.model)?)
        }
        ProviderKind::CodexAuth => {
            Provider::CodexAuth(CodexAuthProvider::new(tokens, &selection.model)?)
        }
    };

    info!(
        kind = %selection.kind,
        vendor = selection.vendor.unwrap_or("-"),
        model = %selection.model,
        api_base = %selection.api_base,
        "Created LLM provider"
    );
    Ok(provider)
}
