//! OAuth credentials for the Claude-OAuth and Codex-OAuth backends.
//!
//! Credentials are written by an external login flow into
//! `~/.llmux/auth.json`:
//!
//! ```json
//! {
//!   "credentials": {
//!     "anthropic": { "accessToken": "...", "expiresAt": "2026-01-01T00:00:00Z" },
//!     "openai":    { "accessToken": "...", "accountId": "acct_..." }
//!   }
//! }
//! ```
//!
//! The store is re-read on every lookup so a refreshed token is picked up
//! without rebuilding the provider.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

/// One stored OAuth credential.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCredential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// ChatGPT account id, sent by the Codex backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthCredential {
    pub fn new(access_token: impl Into<String>) -> Self {
        AuthCredential {
            access_token: access_token.into(),
            refresh_token: None,
            account_id: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| at <= Utc::now())
    }
}

// Tokens never reach logs.
impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("access_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthFile {
    #[serde(default)]
    credentials: HashMap<String, AuthCredential>,
}

/// Where the OAuth backends get their bearer tokens from.
pub trait TokenSource: Send + Sync {
    /// A usable (present, unexpired) credential for `provider`.
    fn credential(&self, provider: &str) -> Result<AuthCredential, ProviderError>;
}

/// File-backed [`TokenSource`].
#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuthStore { path: path.into() }
    }

    /// Store at the default location (`~/.llmux/auth.json`).
    pub fn default_location() -> Self {
        Self::new(llmux_core::utils::get_auth_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, provider: &str) -> Result<AuthFile, ProviderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ProviderError::Credentials {
            provider: provider.to_string(),
            reason: format!("cannot read {}: {}", self.path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| ProviderError::Credentials {
            provider: provider.to_string(),
            reason: format!("invalid {}: {}", self.path.display(), e),
        })
    }

    /// Write `credential` for `provider`, keeping other entries.
    pub fn save(&self, provider: &str, credential: AuthCredential) -> Result<(), ProviderError> {
        let mut file = if self.path.exists() {
            self.read(provider)?
        } else {
            AuthFile::default()
        };
        file.credentials.insert(provider.to_string(), credential);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&file).map_err(ProviderError::decode)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl TokenSource for AuthStore {
    fn credential(&self, provider: &str) -> Result<AuthCredential, ProviderError> {
        let mut file = self.read(provider)?;
        let credential = file
            .credentials
            .remove(provider)
            .filter(|c| !c.access_token.trim().is_empty())
            .ok_or_else(|| ProviderError::Credentials {
                provider: provider.to_string(),
                reason: "not logged in".to_string(),
            })?;

        if credential.is_expired() {
            return Err(ProviderError::Credentials {
                provider: provider.to_string(),
                reason: "token expired, log in again".to_string(),
            });
        }

        debug!(provider, path = %self.path.display(), "loaded OAuth credential");
        Ok(credential)
    }
}

/// Fixed credential, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub AuthCredential);

impl TokenSource for StaticToken {
    fn credential(&self, _provider: &str) -> Result<AuthCredential, ProviderError> {
        Ok(self.0.clone())
    }
}
