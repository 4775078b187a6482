//! Vendor registry — static specs for every supported LLM vendor.
//!
//! This table is the single source of truth for vendor defaults. The selector
//! consults it to route a model to a vendor (routing prefixes, keywords,
//! default base URL, OAuth support) and the wire codec consults it for
//! per-model quirks (namespace stripping, token-limit parameter name, forced
//! parameter values). Adding a vendor means adding an entry here.

// ─────────────────────────────────────────────
// VendorSpec — static metadata for one vendor
// ─────────────────────────────────────────────

/// Static specification describing one LLM vendor.
#[derive(Clone, Debug)]
pub struct VendorSpec {
    /// Internal name, also the config section (e.g. `"openrouter"`).
    pub name: &'static str,
    /// Other names accepted in `agents.defaults.provider` (e.g. `"gpt"`).
    pub aliases: &'static [&'static str],
    /// Human-readable name for logs. E.g. `"OpenRouter"`.
    pub display_name: &'static str,
    /// Keywords matched against the lowercase model name. E.g. `&["kimi", "moonshot"]`.
    pub keywords: &'static [&'static str],
    /// Prefixes matched against the start of the bare model name. E.g. `&["o1"]`.
    pub model_prefixes: &'static [&'static str],
    /// Model-name prefixes that route straight to this vendor. E.g. `&["groq/"]`.
    pub route_prefixes: &'static [&'static str],
    /// Namespace the wire codec strips from `namespace/model` before sending.
    pub wire_namespace: Option<&'static str>,
    /// Default API base URL.
    pub default_api_base: Option<&'static str>,
    /// Whether the vendor has a dedicated OAuth-authenticated backend.
    pub supports_oauth: bool,
    /// Whether this is a gateway/aggregator (fallback for unknown models).
    pub is_gateway: bool,
    /// Whether this is a local/self-hosted endpoint (key optional).
    pub is_local: bool,
    /// If the API base URL contains this substring, the endpoint is this vendor's.
    pub detect_by_base_keyword: Option<&'static str>,
    /// Whether this vendor's endpoint expects namespaced ids like `"openai/gpt-4o"`.
    pub keeps_model_namespace: bool,
    /// Model substrings whose API rejects `max_tokens` in favour of `max_completion_tokens`.
    pub max_completion_tokens_models: &'static [&'static str],
    /// Per-model parameter values forced regardless of the caller's choice.
    pub model_overrides: &'static [ModelOverride],
}

/// A per-model parameter override.
#[derive(Clone, Debug)]
pub struct ModelOverride {
    /// Substring to match in the lowercase model name.
    pub pattern: &'static str,
    /// The field to override.
    pub field: OverrideField,
    /// The value to set.
    pub value: f64,
}

/// Fields that can be overridden per model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideField {
    Temperature,
}

/// Which wire parameter carries the output token limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenLimitParam {
    MaxTokens,
    MaxCompletionTokens,
}

impl TokenLimitParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenLimitParam::MaxTokens => "max_tokens",
            TokenLimitParam::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

// ─────────────────────────────────────────────
// All vendors (keyword matching follows this order)
// ─────────────────────────────────────────────

pub static VENDORS: &[VendorSpec] = &[
    // Gateway. Hosts many vendors' models under their own namespaces.
    VendorSpec {
        name: "openrouter",
        aliases: &[],
        display_name: "OpenRouter",
        keywords: &["openrouter"],
        model_prefixes: &[],
        route_prefixes: &[
            "openrouter/",
            "anthropic/",
            "openai/",
            "meta-llama/",
            "deepseek/",
            "google/",
        ],
        wire_namespace: Some("openrouter"),
        default_api_base: Some("https://openrouter.ai/api/v1"),
        supports_oauth: false,
        is_gateway: true,
        is_local: false,
        detect_by_base_keyword: Some("openrouter.ai"),
        keeps_model_namespace: true,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    // Kimi K2 models only accept temperature = 1.0
    VendorSpec {
        name: "moonshot",
        aliases: &["kimi"],
        display_name: "Moonshot",
        keywords: &["kimi", "moonshot"],
        model_prefixes: &[],
        route_prefixes: &["moonshot/"],
        wire_namespace: Some("moonshot"),
        default_api_base: Some("https://api.moonshot.cn/v1"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[ModelOverride {
            pattern: "kimi-k2",
            field: OverrideField::Temperature,
            value: 1.0,
        }],
    },
    VendorSpec {
        name: "anthropic",
        aliases: &["claude"],
        display_name: "Anthropic",
        keywords: &["claude"],
        model_prefixes: &[],
        route_prefixes: &[],
        wire_namespace: None,
        default_api_base: Some("https://api.anthropic.com/v1"),
        supports_oauth: true,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    VendorSpec {
        name: "openai",
        aliases: &["gpt"],
        display_name: "OpenAI",
        keywords: &["gpt"],
        model_prefixes: &["o1", "o3", "o4"],
        route_prefixes: &[],
        wire_namespace: None,
        default_api_base: Some("https://api.openai.com/v1"),
        supports_oauth: true,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &["o1", "gpt-5"],
        model_overrides: &[],
    },
    VendorSpec {
        name: "gemini",
        aliases: &["google"],
        display_name: "Gemini",
        keywords: &["gemini"],
        model_prefixes: &[],
        route_prefixes: &[],
        wire_namespace: Some("google"),
        default_api_base: Some("https://generativelanguage.googleapis.com/v1beta"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    VendorSpec {
        name: "zhipu",
        aliases: &["glm", "zai"],
        display_name: "ZhiPu",
        keywords: &["glm", "zhipu", "zai"],
        model_prefixes: &[],
        route_prefixes: &["zhipu/"],
        wire_namespace: Some("zhipu"),
        default_api_base: Some("https://open.bigmodel.cn/api/paas/v4"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &["glm"],
        model_overrides: &[],
    },
    VendorSpec {
        name: "groq",
        aliases: &[],
        display_name: "Groq",
        keywords: &["groq"],
        model_prefixes: &[],
        route_prefixes: &["groq/"],
        wire_namespace: Some("groq"),
        default_api_base: Some("https://api.groq.com/openai/v1"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    VendorSpec {
        name: "nvidia",
        aliases: &[],
        display_name: "NVIDIA",
        keywords: &["nvidia"],
        model_prefixes: &[],
        route_prefixes: &["nvidia/"],
        wire_namespace: Some("nvidia"),
        default_api_base: Some("https://integrate.api.nvidia.com/v1"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    VendorSpec {
        name: "ollama",
        aliases: &[],
        display_name: "Ollama",
        keywords: &["ollama"],
        model_prefixes: &[],
        route_prefixes: &["ollama/"],
        wire_namespace: Some("ollama"),
        default_api_base: Some("http://localhost:11434/v1"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    VendorSpec {
        name: "deepseek",
        aliases: &[],
        display_name: "DeepSeek",
        keywords: &["deepseek"],
        model_prefixes: &[],
        route_prefixes: &[],
        wire_namespace: Some("deepseek"),
        default_api_base: Some("https://api.deepseek.com/v1"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    VendorSpec {
        name: "dashscope",
        aliases: &["qwen"],
        display_name: "DashScope",
        keywords: &["qwen", "dashscope"],
        model_prefixes: &[],
        route_prefixes: &[],
        wire_namespace: None,
        default_api_base: Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
        supports_oauth: false,
        is_gateway: false,
        is_local: false,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
    // Self-hosted; endpoint must come from config.
    VendorSpec {
        name: "vllm",
        aliases: &[],
        display_name: "vLLM",
        keywords: &[],
        model_prefixes: &[],
        route_prefixes: &[],
        wire_namespace: None,
        default_api_base: None,
        supports_oauth: false,
        is_gateway: false,
        is_local: true,
        detect_by_base_keyword: None,
        keeps_model_namespace: false,
        max_completion_tokens_models: &[],
        model_overrides: &[],
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a vendor spec by exact name.
pub fn find_by_name(name: &str) -> Option<&'static VendorSpec> {
    VENDORS.iter().find(|spec| spec.name == name)
}

/// Find a vendor spec by name or alias (case-insensitive).
pub fn find_by_alias(name: &str) -> Option<&'static VendorSpec> {
    let lower = name.trim().to_lowercase();
    VENDORS
        .iter()
        .find(|spec| spec.name == lower || spec.aliases.contains(&lower.as_str()))
}

/// Find the vendor whose routing prefix starts `model`.
///
/// Returns the spec and the bare model name with the prefix removed.
pub fn find_by_route_prefix(model: &str) -> Option<(&'static VendorSpec, &str)> {
    VENDORS.iter().find_map(|spec| {
        spec.route_prefixes.iter().find_map(|prefix| {
            let head = model.get(..prefix.len())?;
            let rest = model.get(prefix.len()..)?;
            head.eq_ignore_ascii_case(prefix).then_some((spec, rest))
        })
    })
}

/// Find a vendor by matching keywords against a model name.
///
/// Skips gateways and local endpoints — those are fallback only.
/// Returns the first match in table order.
pub fn find_by_model(model: &str) -> Option<&'static VendorSpec> {
    let model_lower = model.to_lowercase();
    let bare = model_lower.rsplit('/').next().unwrap_or(&model_lower);
    VENDORS.iter().find(|spec| {
        !spec.is_gateway
            && !spec.is_local
            && (spec.keywords.iter().any(|kw| model_lower.contains(kw))
                || spec.model_prefixes.iter().any(|p| bare.starts_with(p)))
    })
}

/// Identify a vendor from its endpoint URL (e.g. anything on `openrouter.ai`).
pub fn find_by_api_base(api_base: &str) -> Option<&'static VendorSpec> {
    let base_lower = api_base.to_lowercase();
    VENDORS.iter().find(|spec| {
        spec.detect_by_base_keyword
            .map_or(false, |kw| base_lower.contains(kw))
    })
}

/// Gateways in table order.
pub fn gateways() -> impl Iterator<Item = &'static VendorSpec> {
    VENDORS.iter().filter(|spec| spec.is_gateway)
}

// ─────────────────────────────────────────────
// Wire quirks
// ─────────────────────────────────────────────

/// Model name as the endpoint at `api_base` expects it.
///
/// Strips a known vendor namespace (`"moonshot/kimi-k2.5"` → `"kimi-k2.5"`)
/// unless the endpoint itself expects namespaced ids (OpenRouter).
pub fn wire_model_name<'a>(model: &'a str, api_base: &str) -> &'a str {
    if find_by_api_base(api_base).map_or(false, |spec| spec.keeps_model_namespace) {
        return model;
    }

    let Some((namespace, rest)) = model.split_once('/') else {
        return model;
    };
    let namespace = namespace.to_lowercase();
    let known = VENDORS
        .iter()
        .any(|spec| spec.wire_namespace == Some(namespace.as_str()));

    if known {
        rest
    } else {
        model
    }
}

/// Which parameter name carries the token limit for `model`.
pub fn token_limit_param(model: &str) -> TokenLimitParam {
    let model_lower = model.to_lowercase();
    let renamed = VENDORS.iter().any(|spec| {
        spec.max_completion_tokens_models
            .iter()
            .any(|pattern| model_lower.contains(pattern))
    });

    if renamed {
        TokenLimitParam::MaxCompletionTokens
    } else {
        TokenLimitParam::MaxTokens
    }
}

/// Apply per-model overrides to the caller's temperature.
///
/// E.g. Kimi K2 forces `temperature = 1.0`.
pub fn apply_model_overrides(model: &str, temperature: f64) -> f64 {
    let model_lower = model.to_lowercase();
    let mut temp = temperature;

    for ovr in VENDORS.iter().flat_map(|spec| spec.model_overrides) {
        if model_lower.contains(ovr.pattern) {
            match ovr.field {
                OverrideField::Temperature => temp = ovr.value,
            }
        }
    }

    temp
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
