//! The transport seam.
//!
//! The core never speaks HTTP itself. Everything it needs from the remote
//! API goes through [`Transport::call`], which takes a method name and a JSON
//! parameter object and returns the API's success/failure envelope. Concrete
//! implementations live in `sakura-transport`; tests script their own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ApiError, ApiResult, TransportResult};

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// The user agent the toolkit identifies itself with unless configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:62.0) Gecko/20100101 Firefox/62.0";

/// The API's response envelope.
///
/// Every method answers with `{ "ok": bool, "result": ..., "description": ... }`;
/// failures additionally carry an `error_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    /// Whether the call succeeded.
    pub ok: bool,

    /// The payload on success.
    pub result: Option<T>,

    /// Human-readable description, usually present on failure.
    #[serde(default)]
    pub description: Option<String>,

    /// Error code on failure.
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// Builds a successful envelope.
    pub fn success(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            description: None,
            error_code: None,
        }
    }

    /// Builds a failed envelope.
    pub fn failure(error_code: i64, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            description: Some(description.into()),
            error_code: Some(error_code),
        }
    }

    /// Unpacks the envelope into its result.
    pub fn into_result(self, method: &str) -> ApiResult<T> {
        if !self.ok {
            return Err(ApiError::NotOk {
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        self.result.ok_or_else(|| ApiError::MissingResult {
            method: method.to_string(),
        })
    }
}

/// A request/response exchange with the remote API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Calls `method` with `params` (a JSON object) and returns the envelope.
    ///
    /// Long-polling methods may block up to the `timeout` they were given.
    async fn call(&self, method: &str, params: Value) -> TransportResult<ApiResponse<Value>>;
}

/// Shared transport handle, injected into the poller and the runtime.
pub type BoxedTransport = Arc<dyn Transport>;

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, method: &str, params: Value) -> TransportResult<ApiResponse<Value>> {
        (**self).call(method, params).await
    }
}

/// Identity of the bot behind a token, as returned by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    /// Unique identifier of the bot.
    pub id: i64,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// Display name.
    #[serde(default)]
    pub first_name: String,
    /// Username, without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
}

/// Typed helpers on top of any [`Transport`].
#[async_trait]
pub trait TransportExt: Transport {
    /// Calls `method` and deserializes the unpacked result into `T`.
    async fn call_as<T>(&self, method: &str, params: Value) -> ApiResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let response = self.call(method, params).await?;
        let value = response.into_result(method)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns the bot's identity; fails if the token is not valid.
    async fn get_me(&self) -> ApiResult<BotInfo> {
        self.call_as("getMe", Value::Object(Default::default()))
            .await
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}

/// Settings for an HTTP transport.
#[derive(Clone)]
pub struct HttpClientConfig {
    /// Base URL of the API, without the `/bot<token>` suffix.
    pub api_url: String,
    /// Bot token.
    pub token: String,
    /// Overall request timeout; `None` disables it.
    ///
    /// Must exceed any long-poll timeout passed to `getUpdates`.
    pub timeout: Option<Duration>,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl HttpClientConfig {
    /// Creates a config for `token` against the default endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Overrides the API base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the full URL for `method`.
    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_url.trim_end_matches('/'),
            self.token,
            method
        )
    }

    /// Returns the token with its secret half masked, for logs.
    pub fn redacted_token(&self) -> String {
        match self.token.split_once(':') {
            Some((id, _)) => format!("{id}:***"),
            None => "***".to_string(),
        }
    }
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.redacted_token())
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::TransportError;
    use serde_json::json;

    struct FixedTransport(ApiResponse<Value>);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn call(&self, _method: &str, _params: Value) -> TransportResult<ApiResponse<Value>> {
            Ok(self.0.clone())
        }
    }

    struct DownTransport;

    #[async_trait]
    impl Transport for DownTransport {
        async fn call(&self, _method: &str, _params: Value) -> TransportResult<ApiResponse<Value>> {
            Err(TransportError::Io("connection refused".into()))
        }
    }

    #[test]
    fn test_envelope_parsing() {
        let ok: ApiResponse =
            serde_json::from_value(json!({"ok": true, "result": [1, 2]})).unwrap();
        assert_eq!(ok.into_result("getUpdates").unwrap(), json!([1, 2]));

        let failed: ApiResponse = serde_json::from_value(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        }))
        .unwrap();
        assert!(matches!(
            failed.into_result("getMe"),
            Err(ApiError::NotOk { code: Some(401), .. })
        ));

        let empty: ApiResponse = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(matches!(
            empty.into_result("getMe"),
            Err(ApiError::MissingResult { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_me() {
        let transport = FixedTransport(ApiResponse::success(json!({
            "id": 123456,
            "is_bot": true,
            "first_name": "Sakura",
            "username": "sakura_bot"
        })));
        let me = transport.get_me().await.unwrap();
        assert_eq!(me.id, 123456);
        assert_eq!(me.username.as_deref(), Some("sakura_bot"));

        let rejected = FixedTransport(ApiResponse::failure(401, "Unauthorized"));
        assert!(rejected.get_me().await.is_err());

        let err = DownTransport.get_me().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Io(_))));
    }

    #[test]
    fn test_method_url_and_redaction() {
        let config = HttpClientConfig::new("123:SECRET").api_url("http://localhost:8081/");
        assert_eq!(
            config.method_url("getUpdates"),
            "http://localhost:8081/bot123:SECRET/getUpdates"
        );
        assert_eq!(config.redacted_token(), "123:***");
        assert_eq!(HttpClientConfig::new("garbage").redacted_token(), "***");
        assert!(!format!("{config:?}").contains("SECRET"));
    }
}
