//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentsConfig` (defaults: provider, model, workspace,
//! sampling) and `ProvidersConfig` (one `ProviderConfig` per vendor).
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.llmux/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
}

impl Config {
    /// Workspace directory with `~` expanded.
    pub fn workspace_path(&self) -> std::path::PathBuf {
        crate::utils::expand_home(&self.agents.defaults.workspace)
    }
}

// ─────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────

/// Agent configuration container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

/// Default agent settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    /// Workspace directory (used by the CLI-driven backend).
    pub workspace: String,
    /// Explicit backend name (e.g. `"claude-cli"`, `"copilot"`, `"groq"`).
    /// Empty means "infer from the model".
    pub provider: String,
    /// Requested model identifier.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            workspace: "~/.llmux/workspace".to_string(),
            provider: String::new(),
            model: "glm-4.7".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single vendor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for bearer authentication.
    pub api_key: String,
    /// Custom API base URL (overrides the vendor default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// `""`/`"api_key"` for direct keys, `"oauth"`/`"token"` for OAuth.
    pub auth_method: String,
    /// HTTP proxy URL for requests to this vendor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this vendor has an API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Whether authentication is delegated to an OAuth credential.
    pub fn uses_oauth(&self) -> bool {
        matches!(
            self.auth_method.trim().to_lowercase().as_str(),
            "oauth" | "token"
        )
    }

    /// Non-empty base URL override, if any.
    pub fn api_base_override(&self) -> Option<&str> {
        self.api_base.as_deref().filter(|b| !b.trim().is_empty())
    }

    /// Non-empty proxy URL, if any.
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Local GitHub Copilot bridge settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopilotConfig {
    /// Bridge address. Defaults to `localhost:4321` when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Optional bearer token for the bridge.
    pub api_key: String,
}

/// All vendor configurations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
    pub openai: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub groq: ProviderConfig,
    pub zhipu: ProviderConfig,
    pub gemini: ProviderConfig,
    pub vllm: ProviderConfig,
    pub nvidia: ProviderConfig,
    pub ollama: ProviderConfig,
    pub moonshot: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub dashscope: ProviderConfig,
    pub github_copilot: CopilotConfig,
}

impl ProvidersConfig {
    /// Get a vendor config by registry name (e.g. `"anthropic"`).
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "anthropic" => Some(&self.anthropic),
            "openai" => Some(&self.openai),
            "openrouter" => Some(&self.openrouter),
            "groq" => Some(&self.groq),
            "zhipu" => Some(&self.zhipu),
            "gemini" => Some(&self.gemini),
            "vllm" => Some(&self.vllm),
            "nvidia" => Some(&self.nvidia),
            "ollama" => Some(&self.ollama),
            "moonshot" => Some(&self.moonshot),
            "deepseek" => Some(&self.deepseek),
            "dashscope" => Some(&self.dashscope),
            _ => None,
        }
    }

    /// Mutable access by registry name (used by env overrides).
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut ProviderConfig> {
        match name {
            "anthropic" => Some(&mut self.anthropic),
            "openai" => Some(&mut self.openai),
            "openrouter" => Some(&mut self.openrouter),
            "groq" => Some(&mut self.groq),
            "zhipu" => Some(&mut self.zhipu),
            "gemini" => Some(&mut self.gemini),
            "vllm" => Some(&mut self.vllm),
            "nvidia" => Some(&mut self.nvidia),
            "ollama" => Some(&mut self.ollama),
            "moonshot" => Some(&mut self.moonshot),
            "deepseek" => Some(&mut self.deepseek),
            "dashscope" => Some(&mut self.dashscope),
            _ => None,
        }
    }
}

/// Vendor section names, in the order they appear in `ProvidersConfig`.
pub const VENDOR_SECTIONS: &[&str] = &[
    "anthropic",
    "openai",
    "openrouter",
    "groq",
    "zhipu",
    "gemini",
    "vllm",
    "nvidia",
    "ollama",
    "moonshot",
    "deepseek",
    "dashscope",
];

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agents.defaults.max_tokens, 8192);
        assert_eq!(config.agents.defaults.temperature, 0.7);
        assert!(config.agents.defaults.provider.is_empty());
        assert!(!config.providers.openrouter.is_configured());
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "agents": {
                "defaults": {
                    "provider": "groq",
                    "model": "llama-3.3-70b",
                    "maxTokens": 1024
                }
            },
            "providers": {
                "moonshot": {
                    "apiKey": "ms-key",
                    "proxy": "http://127.0.0.1:7890"
                },
                "anthropic": { "authMethod": "oauth" },
                "githubCopilot": { "apiBase": "localhost:9999" }
            }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.agents.defaults.provider, "groq");
        assert_eq!(config.agents.defaults.max_tokens, 1024);
        // Missing fields keep defaults
        assert_eq!(config.agents.defaults.temperature, 0.7);
        assert_eq!(config.providers.moonshot.proxy_url(), Some("http://127.0.0.1:7890"));
        assert!(config.providers.anthropic.uses_oauth());
        assert_eq!(
            config.providers.github_copilot.api_base.as_deref(),
            Some("localhost:9999")
        );
    }

    #[test]
    fn test_uses_oauth_variants() {
        let mut cfg = ProviderConfig::default();
        assert!(!cfg.uses_oauth());
        cfg.auth_method = "api_key".into();
        assert!(!cfg.uses_oauth());
        cfg.auth_method = "OAuth".into();
        assert!(cfg.uses_oauth());
        cfg.auth_method = "token".into();
        assert!(cfg.uses_oauth());
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let cfg = ProviderConfig {
            api_base: Some("  ".into()),
            proxy: Some(String::new()),
            ..Default::default()
        };
        assert!(cfg.api_base_override().is_none());
        assert!(cfg.proxy_url().is_none());
    }

    #[test]
    fn test_get_by_name_covers_all_sections() {
        let mut providers = ProvidersConfig::default();
        for name in VENDOR_SECTIONS {
            assert!(providers.get_by_name(name).is_some(), "missing {name}");
            assert!(providers.get_by_name_mut(name).is_some(), "missing {name}");
        }
        assert!(providers.get_by_name("minimax").is_none());
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json["agents"]["defaults"].get("maxTokens").is_some());
        assert!(json["providers"].get("githubCopilot").is_some());
        assert!(json["providers"]["openai"].get("authMethod").is_some());
        assert!(json["agents"]["defaults"].get("max_tokens").is_none());
    }
}
