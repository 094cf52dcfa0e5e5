//! Configuration schema definitions.
//!
//! ```toml
//! [bot]
//! token = "123456:ABC-DEF"
//! request_timeout_secs = 40
//!
//! [polling]
//! max_concurrency = 10
//! timeout_secs = 30
//! allowed_updates = ["message", "callback_query"]
//!
//! [logging]
//! level = "debug"
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sakura_core::{
    DEFAULT_API_URL, DEFAULT_INITIAL_OFFSET, DEFAULT_MAX_CONCURRENCY, DEFAULT_USER_AGENT,
    HttpClientConfig, PollOptions,
};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SakuraConfig {
    /// Bot identity and API access.
    #[serde(default)]
    pub bot: BotConfig,

    /// Polling loop settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot identity and API access.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot token, `<bot id>:<secret>`.
    #[serde(default)]
    pub token: String,

    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout in seconds; 0 disables it.
    #[serde(default)]
    pub request_timeout_secs: u64,

    /// `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Call `getMe` at startup and refuse to run with a rejected token.
    #[serde(default = "default_true")]
    pub verify_token: bool,

    /// User ids treated as the bot's administrators.
    #[serde(default)]
    pub admins: Vec<i64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            request_timeout_secs: 0,
            user_agent: default_user_agent(),
            verify_token: true,
            admins: Vec::new(),
        }
    }
}

impl BotConfig {
    /// The HTTP request timeout, if enabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Converts to the transport's client settings.
    pub fn to_client_config(&self) -> HttpClientConfig {
        let config = HttpClientConfig::new(self.token.clone())
            .api_url(self.api_url.clone())
            .user_agent(self.user_agent.clone());
        match self.request_timeout() {
            Some(timeout) => config.timeout(timeout),
            None => config,
        }
    }

    /// Whether `user_id` is listed in `admins`.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"***")
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("verify_token", &self.verify_token)
            .field("admins", &self.admins)
            .finish()
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Polling
// =============================================================================

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Maximum number of handlers running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Long-poll timeout in seconds; unset means short polling.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum batch size (1-100).
    #[serde(default)]
    pub limit: Option<u32>,

    /// Update types to receive; empty keeps the server-side setting.
    #[serde(default)]
    pub allowed_updates: Vec<String>,

    /// Offset of the first fetch.
    #[serde(default = "default_initial_offset")]
    pub initial_offset: i64,

    /// Backoff between failed fetches; unset retries immediately.
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// How long to wait for running handlers at shutdown; 0 waits
    /// indefinitely.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            timeout_secs: None,
            limit: None,
            allowed_updates: Vec::new(),
            initial_offset: default_initial_offset(),
            retry: None,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl PollingConfig {
    /// Converts to the fetch options sent with every `getUpdates`.
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            allowed_updates: (!self.allowed_updates.is_empty())
                .then(|| self.allowed_updates.iter().cloned().collect::<BTreeSet<_>>()),
            timeout: self.timeout_secs.map(Duration::from_secs),
            limit: self.limit,
        }
    }

    /// The drain bound at shutdown.
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        (self.shutdown_timeout_secs > 0).then(|| Duration::from_secs(self.shutdown_timeout_secs))
    }
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_initial_offset() -> i64 {
    DEFAULT_INITIAL_OFFSET
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Converts to core retry config.
    pub fn to_core_retry(&self) -> sakura_core::RetryConfig {
        sakura_core::RetryConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.backoff_multiplier,
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which lifecycle events of the per-update handler spans are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `sakura_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Lifecycle logging for handler tasks; `close` also reports their busy time.
    #[serde(default)]
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SakuraConfig::default();
        assert_eq!(config.bot.api_url, "https://api.telegram.org");
        assert_eq!(config.bot.request_timeout(), None);
        assert!(config.bot.verify_token);
        assert_eq!(config.polling.max_concurrency, 10);
        assert_eq!(config.polling.initial_offset, -1);
        assert_eq!(config.polling.poll_options(), PollOptions::default());
        assert_eq!(
            config.polling.shutdown_timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
bot:
  token: "123:abc"
  request_timeout_secs: 40
polling:
  timeout_secs: 30
  limit: 50
  allowed_updates: [message, callback_query]
  retry:
    initial_delay_ms: 500
logging:
  level: debug
  format: pretty
  filters:
    sakura_core: trace
"#;
        let config: SakuraConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot.request_timeout(), Some(Duration::from_secs(40)));

        let options = config.polling.poll_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.limit, Some(50));
        assert_eq!(options.allowed_updates.unwrap().len(), 2);

        let retry = config.polling.retry.unwrap().to_core_retry();
        assert_eq!(retry.initial_delay, Duration::from_millis(500));
        assert_eq!(retry.max_delay, Duration::from_secs(30));

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filters["sakura_core"], LogLevel::Trace);
    }

    #[test]
    fn test_client_config_hides_token() {
        let bot = BotConfig {
            token: "42:SECRET".into(),
            request_timeout_secs: 5,
            ..Default::default()
        };
        let client = bot.to_client_config();
        assert_eq!(client.timeout, Some(Duration::from_secs(5)));
        assert_eq!(client.method_url("getMe"), "https://api.telegram.org/bot42:SECRET/getMe");
        assert!(!format!("{bot:?}").contains("SECRET"));
    }

    #[test]
    fn test_admins() {
        assert!(BotConfig::default().admins.is_empty());

        let config: SakuraConfig =
            serde_yaml::from_str("bot:\n  token: \"1:a\"\n  admins: [1001, -7]\n").unwrap();
        assert!(config.bot.is_admin(1001));
        assert!(config.bot.is_admin(-7));
        assert!(!config.bot.is_admin(42));
        assert!(format!("{:?}", config.bot).contains("1001"));
    }
}
