//! Config loader — reads `~/.llmux/config.json`, merges env vars, and
//! applies legacy migrations.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.llmux/config.json`
//! 3. Environment variables `LLMUX_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig, VENDOR_SECTIONS};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Why a config file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not valid llmux config: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load configuration from `path` (or the default path) + env vars.
///
/// A missing or unusable file falls back to `Config::default()`; env vars
/// still apply either way.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    let config = match read_config_file(&config_path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            info!("No config file found at {}, using defaults", config_path.display());
            Config::default()
        }
        Err(e) => {
            warn!("{e}; using defaults");
            Config::default()
        }
    };
    apply_env_overrides(config)
}

/// Read and migrate the JSON file at `path`. `Ok(None)` when it does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<Config>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    debug!("Loading config from {}", path.display());

    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let mut raw: serde_json::Value = serde_json::from_str(&content).map_err(parse_err)?;
    migrate_config(&mut raw);
    serde_json::from_value(raw).map(Some).map_err(parse_err)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// Moves `providers.copilot` → `providers.githubCopilot`.
fn migrate_config(raw: &mut serde_json::Value) {
    let Some(providers) = raw.get_mut("providers").and_then(|p| p.as_object_mut()) else {
        return;
    };
    if providers.contains_key("githubCopilot") {
        return;
    }
    if let Some(legacy) = providers.remove("copilot") {
        providers.insert("githubCopilot".to_string(), legacy);
        debug!("Migrated providers.copilot → providers.githubCopilot");
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `LLMUX_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `LLMUX_AGENTS__DEFAULTS__PROVIDER` → `agents.defaults.provider`
/// - `LLMUX_AGENTS__DEFAULTS__MODEL` → `agents.defaults.model`
/// - `LLMUX_AGENTS__DEFAULTS__WORKSPACE` → `agents.defaults.workspace`
/// - `LLMUX_AGENTS__DEFAULTS__MAX_TOKENS` → `agents.defaults.max_tokens`
/// - `LLMUX_AGENTS__DEFAULTS__TEMPERATURE` → `agents.defaults.temperature`
/// - `LLMUX_PROVIDERS__<NAME>__{API_KEY,API_BASE,AUTH_METHOD,PROXY}`
/// - `LLMUX_PROVIDERS__GITHUB_COPILOT__{API_KEY,API_BASE}`
fn apply_env_overrides(mut config: Config) -> Config {
    let defaults = &mut config.agents.defaults;
    if let Ok(val) = std::env::var("LLMUX_AGENTS__DEFAULTS__PROVIDER") {
        defaults.provider = val;
    }
    if let Ok(val) = std::env::var("LLMUX_AGENTS__DEFAULTS__MODEL") {
        defaults.model = val;
    }
    if let Ok(val) = std::env::var("LLMUX_AGENTS__DEFAULTS__WORKSPACE") {
        defaults.workspace = val;
    }
    if let Ok(val) = std::env::var("LLMUX_AGENTS__DEFAULTS__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            defaults.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("LLMUX_AGENTS__DEFAULTS__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            defaults.temperature = t;
        }
    }

    for name in VENDOR_SECTIONS {
        if let Some(provider) = config.providers.get_by_name_mut(name) {
            apply_provider_env(provider, &name.to_uppercase());
        }
    }

    let copilot = &mut config.providers.github_copilot;
    if let Ok(val) = std::env::var("LLMUX_PROVIDERS__GITHUB_COPILOT__API_KEY") {
        copilot.api_key = val;
    }
    if let Ok(val) = std::env::var("LLMUX_PROVIDERS__GITHUB_COPILOT__API_BASE") {
        copilot.api_base = Some(val);
    }

    config
}

/// Apply env var overrides for a single vendor.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("LLMUX_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("LLMUX_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if let Ok(val) = std::env::var(format!("LLMUX_PROVIDERS__{name}__AUTH_METHOD")) {
        provider.auth_method = val;
    }
    if let Ok(val) = std::env::var(format!("LLMUX_PROVIDERS__{name}__PROXY")) {
        provider.proxy = Some(val);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config(Some(Path::new("/nonexistent/path/config.json")));
        assert_eq!(config.agents.defaults.max_tokens, 8192);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "agents": {
                "defaults": {
                    "model": "openrouter/auto",
                    "maxTokens": 2048
                }
            }
        }"#,
        );

        let config = load_config(Some(file.path()));
        assert_eq!(config.agents.defaults.model, "openrouter/auto");
        assert_eq!(config.agents.defaults.max_tokens, 2048);
        assert_eq!(config.agents.defaults.temperature, 0.7);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config(Some(file.path()));
        assert_eq!(config.agents.defaults.max_tokens, 8192);
    }

    #[test]
    fn test_read_errors_name_the_file() {
        let file = write_temp_json(r#"{"agents": {"defaults": {"maxTokens": "lots"}}}"#);
        let err = read_config_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        assert!(read_config_file(Path::new("/nonexistent/path/config.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.agents.defaults.model = "moonshot/kimi-k2.5".to_string();
        config.providers.moonshot.api_key = "ms-test".to_string();
        config.providers.moonshot.proxy = Some("http://127.0.0.1:7890".to_string());

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config(Some(&path));
        assert_eq!(reloaded.agents.defaults.model, "moonshot/kimi-k2.5");
        assert_eq!(reloaded.providers.moonshot.api_key, "ms-test");
        assert_eq!(
            reloaded.providers.moonshot.proxy_url(),
            Some("http://127.0.0.1:7890")
        );
    }

    #[test]
    fn test_migrate_legacy_copilot_section() {
        let file = write_temp_json(
            r#"{
            "providers": {
                "copilot": { "apiBase": "localhost:5555" }
            }
        }"#,
        );

        let config = load_config(Some(file.path()));
        assert_eq!(
            config.providers.github_copilot.api_base.as_deref(),
            Some("localhost:5555")
        );
    }

    #[test]
    fn test_migrate_no_overwrite() {
        let file = write_temp_json(
            r#"{
            "providers": {
                "githubCopilot": { "apiBase": "localhost:1111" },
                "copilot": { "apiBase": "localhost:2222" }
            }
        }"#,
        );

        let config = load_config(Some(file.path()));
        assert_eq!(
            config.providers.github_copilot.api_base.as_deref(),
            Some("localhost:1111")
        );
    }

    #[test]
    fn test_env_override_provider_fields() {
        std::env::set_var("LLMUX_PROVIDERS__GROQ__API_KEY", "gsk-env");
        std::env::set_var("LLMUX_PROVIDERS__GROQ__PROXY", "http://proxy:8080");
        std::env::set_var("LLMUX_PROVIDERS__GROQ__AUTH_METHOD", "api_key");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.providers.groq.api_key, "gsk-env");
        assert_eq!(config.providers.groq.proxy_url(), Some("http://proxy:8080"));
        assert_eq!(config.providers.groq.auth_method, "api_key");
        std::env::remove_var("LLMUX_PROVIDERS__GROQ__API_KEY");
        std::env::remove_var("LLMUX_PROVIDERS__GROQ__PROXY");
        std::env::remove_var("LLMUX_PROVIDERS__GROQ__AUTH_METHOD");
    }

    #[test]
    fn test_env_override_explicit_provider() {
        std::env::set_var("LLMUX_AGENTS__DEFAULTS__PROVIDER", "claude-cli");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.agents.defaults.provider, "claude-cli");
        std::env::remove_var("LLMUX_AGENTS__DEFAULTS__PROVIDER");
    }

    #[test]
    fn test_full_config_with_providers() {
        let file = write_temp_json(
            r#"{
            "providers": {
                "openrouter": { "apiKey": "sk-or-456", "apiBase": "https://custom.io/v1" },
                "openai": { "authMethod": "oauth" },
                "zhipu": { "apiKey": "zp-789" }
            },
            "agents": {
                "defaults": {
                    "model": "glm-4.7",
                    "temperature": 0.5
                }
            }
        }"#,
        );

        let config = load_config(Some(file.path()));
        assert!(config.providers.openrouter.is_configured());
        assert_eq!(
            config.providers.openrouter.api_base_override(),
            Some("https://custom.io/v1")
        );
        assert!(config.providers.openai.uses_oauth());
        assert!(!config.providers.openai.is_configured());
        assert!(config.providers.zhipu.is_configured());
    }
}
