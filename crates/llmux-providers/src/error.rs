//! Error taxonomy for provider selection and chat requests.

use thiserror::Error;

/// Everything that can go wrong between configuration and a parsed response.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The resolved provider has no credential.
    #[error("no API key configured for provider `{provider}`")]
    MissingProviderKey { provider: String },

    /// No provider could be inferred for the requested model.
    #[error("no API key configured for model `{model}`")]
    MissingModelKey { model: String },

    /// An HTTP-compatible provider was resolved without an endpoint.
    #[error("no API base configured for provider `{provider}`")]
    MissingApiBase { provider: String },

    #[error("invalid proxy URL `{url}`: {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// OAuth credentials are missing, unreadable, or expired.
    #[error("credentials unavailable for {provider}: {reason}")]
    Credentials { provider: String, reason: String },

    /// The CLI-driven backend failed or reported an error.
    #[error("CLI provider error: {0}")]
    Cli(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Errors raised before any network activity because configuration is unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingProviderKey { .. }
                | ProviderError::MissingModelKey { .. }
                | ProviderError::MissingApiBase { .. }
                | ProviderError::InvalidProxy { .. }
        )
    }

    /// Errors caused by the caller abandoning the request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ProviderError::Cancelled | ProviderError::DeadlineExceeded)
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ProviderError::MissingProviderKey {
            provider: "openrouter".into(),
        };
        assert!(err.to_string().contains("no API key configured for provider"));
        assert!(err.is_configuration());

        let err = ProviderError::MissingModelKey {
            model: "custom-model".into(),
        };
        assert_eq!(
            err.to_string(),
            "no API key configured for model `custom-model`"
        );
        assert!(!err.is_cancellation());
    }

    #[test]
    fn test_http_error_carries_status_and_body() {
        let err = ProviderError::Http {
            status: 400,
            body: "bad request".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("bad request"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_cancellation_predicates() {
        assert!(ProviderError::Cancelled.is_cancellation());
        assert!(ProviderError::DeadlineExceeded.is_cancellation());
        assert!(!ProviderError::Decode("x".into()).is_cancellation());
    }
}
