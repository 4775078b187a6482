//! `llmux status` — show configuration and the resolved provider.

use anyhow::Result;
use colored::Colorize;

use llmux_core::config::{get_config_path, load_config, Config};
use llmux_core::utils::get_auth_path;
use llmux_providers::registry::{VendorSpec, VENDORS};
use llmux_providers::resolve_provider_selection;

/// How a vendor section is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorStatus {
    OAuth,
    KeySet,
    /// Local endpoint with a base URL but no key.
    Local,
    NotConfigured,
}

pub fn vendor_status(config: &Config, spec: &VendorSpec) -> VendorStatus {
    let Some(section) = config.providers.get_by_name(spec.name) else {
        return VendorStatus::NotConfigured;
    };
    if spec.supports_oauth && section.uses_oauth() {
        VendorStatus::OAuth
    } else if section.is_configured() {
        VendorStatus::KeySet
    } else if spec.is_local && section.api_base_override().is_some() {
        VendorStatus::Local
    } else {
        VendorStatus::NotConfigured
    }
}

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();
    let defaults = &config.agents.defaults;

    println!();
    println!("{}", "llmux status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    let workspace = config.workspace_path();
    println!(
        "  {:<18} {} {}",
        "Workspace:".bold(),
        workspace.display(),
        if workspace.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    println!("  {:<18} {}", "Model:".bold(), defaults.model);
    println!(
        "  {:<18} {}",
        "Provider:".bold(),
        if defaults.provider.trim().is_empty() {
            "(auto)".dimmed().to_string()
        } else {
            defaults.provider.clone()
        }
    );
    println!(
        "  {:<18} {} | max_tokens: {}",
        "Parameters:".bold(),
        format!("temp: {}", defaults.temperature).dimmed(),
        format!("{}", defaults.max_tokens).dimmed(),
    );

    // Selection
    println!();
    match resolve_provider_selection(&config) {
        Ok(selection) => {
            println!(
                "  {:<18} {} {}",
                "Selected:".bold(),
                selection.kind.to_string().green(),
                selection.vendor.map(|v| format!("({v})")).unwrap_or_default()
            );
            if !selection.api_base.is_empty() {
                println!("  {:<18} {}", "API base:".bold(), selection.api_base);
            }
            if let Some(proxy) = &selection.proxy {
                println!("  {:<18} {}", "Proxy:".bold(), proxy);
            }
            if let Some(workspace) = &selection.workspace {
                println!("  {:<18} {}", "CLI workdir:".bold(), workspace.display());
            }
        }
        Err(e) => println!("  {:<18} {}", "Selected:".bold(), e.to_string().red()),
    }

    // Vendors
    println!();
    println!("  {}", "Providers:".bold());
    for spec in VENDORS {
        let status = match vendor_status(&config, spec) {
            VendorStatus::OAuth => format!("{} (oauth)", "✓".green()),
            VendorStatus::KeySet => format!("{} (key set)", "✓".green()),
            VendorStatus::Local => format!("{} (local endpoint)", "✓".green()),
            VendorStatus::NotConfigured => format!("{}", "· not configured".dimmed()),
        };
        println!("    {:<20} {}", spec.display_name, status);
    }

    let copilot_base = config
        .providers
        .github_copilot
        .api_base
        .as_deref()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or(llmux_providers::selection::COPILOT_DEFAULT_API_BASE);
    println!("    {:<20} {}", "GitHub Copilot", copilot_base.dimmed());

    println!();
    let auth_path = get_auth_path();
    println!(
        "  {:<18} {} {}",
        "OAuth store:".bold(),
        auth_path.display(),
        if auth_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".dimmed().to_string()
        }
    );
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmux_providers::registry::find_by_name;

    #[test]
    fn key_and_oauth_status() {
        let mut config = Config::default();
        config.providers.groq.api_key = "gk".into();
        config.providers.anthropic.auth_method = "oauth".into();
        config.providers.anthropic.api_key = "ignored".into();

        let groq = find_by_name("groq").unwrap();
        let anthropic = find_by_name("anthropic").unwrap();
        let openai = find_by_name("openai").unwrap();
        assert_eq!(vendor_status(&config, groq), VendorStatus::KeySet);
        assert_eq!(vendor_status(&config, anthropic), VendorStatus::OAuth);
        assert_eq!(vendor_status(&config, openai), VendorStatus::NotConfigured);
    }

    #[test]
    fn local_vllm_status() {
        let mut config = Config::default();
        config.providers.vllm.api_base = Some("http://localhost:8000/v1".into());
        let vllm = find_by_name("vllm").unwrap();
        assert_eq!(vendor_status(&config, vllm), VendorStatus::Local);
    }
}
