//! LLM provider layer for llmux.
//!
//! # Architecture
//!
//! - [`selection`] — pure mapping from configuration to a [`ProviderSelection`]
//! - [`registry`] — static vendor table (base URLs, model patterns, wire quirks)
//! - [`factory`] — builds the concrete [`Provider`] for a selection
//! - [`openai_compat`] — wire codec for `/chat/completions` endpoints
//! - [`http_provider::HttpProvider`] — compat adapter over the wire codec
//! - [`copilot`], [`claude_cli`], [`claude_auth`], [`codex_auth`] — the other backends
//! - [`context::RequestContext`] — cancellation and deadlines per call

pub mod auth;
pub mod claude_auth;
pub mod claude_cli;
pub mod codex_auth;
pub mod context;
pub mod copilot;
pub mod error;
pub mod factory;
pub mod http_provider;
pub mod openai_compat;
pub mod registry;
pub mod selection;
pub mod traits;
pub mod transport;

// Re-export main types for convenience
pub use auth::{AuthCredential, AuthStore, TokenSource};
pub use context::RequestContext;
pub use error::ProviderError;
pub use factory::{create_provider, create_provider_from_selection, create_provider_with_tokens, Provider};
pub use http_provider::HttpProvider;
pub use registry::{VendorSpec, VENDORS};
pub use selection::{resolve_provider_selection, ProviderKind, ProviderSelection};
pub use traits::{ChatOptions, LlmProvider};
