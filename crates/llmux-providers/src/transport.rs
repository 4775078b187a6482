//! HTTP plumbing shared by every network-backed provider.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::context::RequestContext;
use crate::error::ProviderError;

/// Overall per-request timeout applied by the client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the reusable client for one provider instance.
///
/// The proxy, if any, is fixed here for the lifetime of the client.
pub fn build_client(proxy: Option<&str>) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

    if let Some(url) = proxy {
        let proxy = reqwest::Proxy::all(url).map_err(|source| ProviderError::InvalidProxy {
            url: url.to_string(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(ProviderError::Client)
}

/// Convert configured extra headers, skipping invalid ones.
pub fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        if let (Ok(name), Ok(val)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.insert(name, val);
        } else {
            warn!("Invalid header: {}", key);
        }
    }
    map
}

/// `base` + `/` + `path`, tolerating a trailing slash and a missing scheme
/// (`localhost:4321` → `http://localhost:4321`).
pub fn endpoint_url(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if base.contains("://") {
        format!("{}/{}", base, path)
    } else {
        format!("http://{}/{}", base, path)
    }
}

/// Send `request` under `ctx` and return the body of a successful response.
///
/// Non-success statuses become [`ProviderError::Http`] carrying the raw body.
pub async fn send(
    ctx: &RequestContext,
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderError> {
    ctx.run(async {
        let response = request.send().await.map_err(|e| {
            error!(provider, error = %e, "HTTP request failed");
            ProviderError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(provider, status = %status, body = %body, "API error");
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    })
    .await
}

/// Parse a JSON body, reporting failures as decode errors.
pub fn decode_json<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        error!(
            provider,
            error = %e,
            body = %llmux_core::utils::truncate_string(body, 200),
            "Failed to parse response"
        );
        ProviderError::decode(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_trailing_slash() {
        assert_eq!(
            endpoint_url("https://api.openai.com/v1/", "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            endpoint_url("https://api.openai.com/v1", "/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        assert_eq!(
            endpoint_url("localhost:4321", "chat/completions"),
            "http://localhost:4321/chat/completions"
        );
    }

    #[test]
    fn test_build_client_with_proxy() {
        assert!(build_client(Some("http://127.0.0.1:7890")).is_ok());
        assert!(build_client(None).is_ok());
    }

    #[test]
    fn test_build_client_invalid_proxy() {
        let err = build_client(Some("not a url")).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidProxy { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_header_map_skips_invalid() {
        let mut headers = HashMap::new();
        headers.insert("X-App-Code".to_string(), "abc".to_string());
        headers.insert("bad header".to_string(), "x".to_string());
        let map = header_map(&headers);
        assert!(map.contains_key("x-app-code"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_decode_json_error() {
        let err = decode_json::<serde_json::Value>("test", "not json").unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
