//! HTTP client transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use sakura_core::{ApiResponse, HttpClientConfig, Transport, TransportError, TransportResult};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Calls API methods with `POST {api_url}/bot{token}/{method}` and a JSON body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpClientConfig,
}

impl HttpTransport {
    /// Creates a transport from `config`.
    pub fn new(config: HttpClientConfig) -> TransportResult<Self> {
        let mut builder = ClientBuilder::new().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        info!(
            api_url = %config.api_url,
            token = %config.redacted_token(),
            timeout = ?config.timeout,
            "HTTP transport ready"
        );

        Ok(Self { client, config })
    }

    /// Creates a transport for `token` against the default endpoint.
    pub fn with_token(token: impl Into<String>) -> TransportResult<Self> {
        Self::new(HttpClientConfig::new(token))
    }

    /// The transport's settings.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// The request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> TransportResult<ApiResponse<Value>> {
        debug!(method, "Calling API method");

        let resp = self
            .client
            .post(self.config.method_url(method))
            .json(&params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(map_reqwest_error)?;
        decode_envelope(status, &body)
    }
}

/// The API reports failures inside the envelope, often with a non-2xx status,
/// so the body is decoded regardless of status.
fn decode_envelope(status: StatusCode, body: &[u8]) -> TransportResult<ApiResponse<Value>> {
    match serde_json::from_slice::<ApiResponse<Value>>(body) {
        Ok(envelope) => Ok(envelope),
        Err(e) if status.is_success() => Err(TransportError::Decode(e.to_string())),
        Err(_) => Err(TransportError::Http {
            status: status.as_u16(),
            body: truncate(&String::from_utf8_lossy(body)),
        }),
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Drops the URL from the error, since it contains the token.
fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::InvalidConfig(err.without_url().to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.without_url().to_string())
    } else {
        TransportError::Io(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_core::TransportExt;

    #[test]
    fn test_error_envelope_on_non_success_status() {
        let body = br#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        let envelope = decode_envelope(StatusCode::UNAUTHORIZED, body).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.error_code, Some(401));
    }

    #[test]
    fn test_non_json_body() {
        let body = b"<html>Bad Gateway</html>";
        let err = decode_envelope(StatusCode::BAD_GATEWAY, body).unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 502, .. }));

        let err = decode_envelope(StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let long = "x".repeat(MAX_ERROR_BODY * 2);
        let short = truncate(&long);
        assert_eq!(short.len(), MAX_ERROR_BODY + 3);
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_hides_token() {
        let config = HttpClientConfig::new("123:SECRET")
            .api_url("http://127.0.0.1:1")
            .timeout(Duration::from_secs(5));
        let transport = HttpTransport::new(config).unwrap();

        let err = transport.get_me().await.unwrap_err();
        assert!(!err.to_string().contains("SECRET"));
    }
}
