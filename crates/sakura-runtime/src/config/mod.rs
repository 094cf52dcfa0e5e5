//! Configuration module for the Sakura runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the bot token, the polling loop and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ConfigLoader, DEFAULT_PROFILE, ENV_PREFIX, PROFILE_ENV, load_config, load_config_from_file,
};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PollingConfig, RetryConfig,
    SakuraConfig, SpanEventConfig,
};
pub use validation::validate_config;
