//! Provider selection — maps configuration + requested model to a backend.
//!
//! [`resolve_provider_selection`] is a pure function of [`Config`]: no I/O,
//! no hidden state. Priority order:
//!
//! 1. An explicit `agents.defaults.provider` naming the CLI-driven or
//!    Copilot-style backend wins immediately. A vendor name wins when that
//!    vendor is configured; otherwise resolution falls through.
//! 2. Otherwise the model decides:
//!    a. a routing prefix (`openrouter/`, `moonshot/`, ...) names the vendor,
//!       whose key must then be configured;
//!    b. a vendor keyword (`claude`, `gpt`, `glm`, ...) names the vendor,
//!       routed to its OAuth backend when configured for OAuth;
//!    c. unknown models fall back to a configured gateway or vLLM endpoint.

use std::collections::HashMap;
use std::path::PathBuf;

use llmux_core::config::{Config, ProviderConfig};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::registry::{self, VendorSpec};

/// Default address of the local Copilot bridge.
pub const COPILOT_DEFAULT_API_BASE: &str = "localhost:4321";

/// Which backend family serves the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Local `claude` CLI subprocess.
    ClaudeCli,
    /// Local GitHub Copilot bridge.
    GitHubCopilot,
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    HttpCompat,
    /// Anthropic Messages API with an OAuth credential.
    ClaudeAuth,
    /// OpenAI Responses API with an OAuth credential.
    CodexAuth,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ClaudeCli => "claude-cli",
            ProviderKind::GitHubCopilot => "github-copilot",
            ProviderKind::HttpCompat => "http-compat",
            ProviderKind::ClaudeAuth => "claude-auth",
            ProviderKind::CodexAuth => "codex-auth",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved routing decision. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderSelection {
    pub kind: ProviderKind,
    /// Registry name of the vendor, when one was resolved.
    pub vendor: Option<&'static str>,
    /// Model as requested (namespace stripping happens on the wire).
    pub model: String,
    /// Endpoint base URL. Empty for backends that don't need one.
    pub api_base: String,
    /// Bearer credential. Empty for backends that don't need one.
    pub api_key: String,
    pub proxy: Option<String>,
    pub extra_headers: HashMap<String, String>,
    /// Working directory for the CLI-driven backend.
    pub workspace: Option<PathBuf>,
}

impl ProviderSelection {
    fn bare(kind: ProviderKind, model: &str) -> Self {
        ProviderSelection {
            kind,
            vendor: None,
            model: model.to_string(),
            api_base: String::new(),
            api_key: String::new(),
            proxy: None,
            extra_headers: HashMap::new(),
            workspace: None,
        }
    }

    fn oauth(spec: &'static VendorSpec, model: &str) -> Self {
        let kind = match spec.name {
            "anthropic" => ProviderKind::ClaudeAuth,
            _ => ProviderKind::CodexAuth,
        };
        ProviderSelection {
            vendor: Some(spec.name),
            ..Self::bare(kind, model)
        }
    }

    fn http(spec: &'static VendorSpec, config: &ProviderConfig, model: &str) -> Self {
        let api_base = config
            .api_base_override()
            .or(spec.default_api_base)
            .unwrap_or_default()
            .to_string();

        ProviderSelection {
            vendor: Some(spec.name),
            api_base,
            api_key: config.api_key.clone(),
            proxy: config.proxy_url().map(String::from),
            extra_headers: config.extra_headers.clone().unwrap_or_default(),
            ..Self::bare(ProviderKind::HttpCompat, model)
        }
    }
}

/// Resolve the backend for `config`. Same input, same output.
pub fn resolve_provider_selection(config: &Config) -> Result<ProviderSelection, ProviderError> {
    let defaults = &config.agents.defaults;
    let model = defaults.model.trim();
    let explicit = defaults.provider.trim().to_lowercase();

    if !explicit.is_empty() {
        if let Some(selection) = resolve_explicit(config, &explicit, model) {
            debug!(
                provider = %explicit,
                kind = %selection.kind,
                "provider selected explicitly"
            );
            return validate(selection);
        }
    }

    resolve_from_model(config, model).and_then(validate)
}

/// Step 1: explicit backend name.
fn resolve_explicit(config: &Config, name: &str, model: &str) -> Option<ProviderSelection> {
    match name {
        "claude-cli" | "claude-code" | "claudecode" => {
            let workspace = if config.agents.defaults.workspace.trim().is_empty() {
                PathBuf::from(".")
            } else {
                config.workspace_path()
            };
            Some(ProviderSelection {
                workspace: Some(workspace),
                ..ProviderSelection::bare(ProviderKind::ClaudeCli, model)
            })
        }
        "copilot" | "github-copilot" | "github_copilot" => {
            let copilot = &config.providers.github_copilot;
            let api_base = copilot
                .api_base
                .as_deref()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or(COPILOT_DEFAULT_API_BASE);
            Some(ProviderSelection {
                api_base: api_base.to_string(),
                api_key: copilot.api_key.clone(),
                ..ProviderSelection::bare(ProviderKind::GitHubCopilot, model)
            })
        }
        _ => match registry::find_by_alias(name) {
            Some(spec) => {
                let selection = select_vendor(config, spec, model);
                if selection.is_none() {
                    debug!(
                        provider = spec.name,
                        "explicit provider not configured, inferring from model"
                    );
                }
                selection
            }
            None => {
                warn!(provider = name, "unknown provider name, inferring from model");
                None
            }
        },
    }
}

/// Step 2: infer from the model name.
fn resolve_from_model(config: &Config, model: &str) -> Result<ProviderSelection, ProviderError> {
    if let Some((spec, bare_model)) = registry::find_by_route_prefix(model) {
        debug!(provider = spec.name, model = bare_model, "model routed by prefix");
        return select_vendor(config, spec, model).ok_or_else(|| {
            ProviderError::MissingProviderKey {
                provider: spec.name.to_string(),
            }
        });
    }

    if let Some(spec) = registry::find_by_model(model) {
        debug!(provider = spec.name, model, "model matched vendor keyword");
        return select_vendor(config, spec, model).ok_or_else(|| ProviderError::MissingModelKey {
            model: model.to_string(),
        });
    }

    for spec in registry::gateways() {
        if let Some(selection) = select_vendor(config, spec, model) {
            debug!(provider = spec.name, model, "unknown model, using gateway");
            return Ok(selection);
        }
    }

    if config.providers.vllm.api_base_override().is_some() {
        if let Some(spec) = registry::find_by_name("vllm") {
            debug!(model, "unknown model, using vLLM endpoint");
            return Ok(ProviderSelection::http(spec, &config.providers.vllm, model));
        }
    }

    Err(ProviderError::MissingModelKey {
        model: model.to_string(),
    })
}

/// Build a selection for `spec` if its config section makes it usable.
fn select_vendor(
    config: &Config,
    spec: &'static VendorSpec,
    model: &str,
) -> Option<ProviderSelection> {
    let vendor_config = config.providers.get_by_name(spec.name)?;

    if spec.supports_oauth && vendor_config.uses_oauth() {
        return Some(ProviderSelection::oauth(spec, model));
    }

    let usable = vendor_config.is_configured()
        || (spec.is_local && vendor_config.api_base_override().is_some());
    usable.then(|| ProviderSelection::http(spec, vendor_config, model))
}

fn validate(selection: ProviderSelection) -> Result<ProviderSelection, ProviderError> {
    if selection.kind != ProviderKind::HttpCompat {
        return Ok(selection);
    }

    let provider = selection.vendor.unwrap_or("unknown").to_string();
    let is_local = selection
        .vendor
        .and_then(registry::find_by_name)
        .map_or(false, |spec| spec.is_local);

    if selection.api_key.is_empty() && !is_local {
        return Err(ProviderError::MissingProviderKey { provider });
    }
    if selection.api_base.is_empty() {
        return Err(ProviderError::MissingApiBase { provider });
    }
    Ok(selection)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
