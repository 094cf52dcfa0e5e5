//! Configuration validation utilities.

use sakura_core::UpdateKind;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, PollingConfig, RetryConfig, SakuraConfig};

/// Largest batch the API hands out.
const MAX_LIMIT: u32 = 100;

/// Validates the entire configuration.
pub fn validate_config(config: &SakuraConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_polling_config(&config.polling)?;
    validate_timeouts(&config.bot, &config.polling)?;

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::Missing("logging.file_path"));
    }

    Ok(())
}

/// Validates the bot section.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    validate_token(&bot.token)?;
    validate_url(&bot.api_url)?;

    if bot.user_agent.trim().is_empty() {
        return Err(ConfigError::Missing("bot.user_agent"));
    }

    Ok(())
}

/// Validates a token of the form `<digits>:<secret>`.
fn validate_token(token: &str) -> ConfigResult<()> {
    if token.is_empty() {
        return Err(ConfigError::Missing("bot.token"));
    }

    let Some((id, secret)) = token.split_once(':') else {
        return Err(ConfigError::invalid(
            "bot.token",
            "expected `<bot id>:<secret>`",
        ));
    };

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::invalid("bot.token", "bot id must be numeric"));
    }

    if secret.is_empty() || secret.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "bot.token",
            "secret must be non-empty and contain no whitespace",
        ));
    }

    Ok(())
}

/// Validates the API base URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::Missing("bot.api_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid(
            "bot.api_url",
            format!("{url:?} must start with one of {valid_schemes:?}"),
        ));
    }

    Ok(())
}

/// Validates the polling section.
fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if polling.max_concurrency == 0 {
        return Err(ConfigError::invalid(
            "polling.max_concurrency",
            "must be at least 1",
        ));
    }

    if let Some(limit) = polling.limit.filter(|l| !(1..=MAX_LIMIT).contains(l)) {
        return Err(ConfigError::invalid(
            "polling.limit",
            format!("must be between 1 and {MAX_LIMIT}, got {limit}"),
        ));
    }

    for tag in &polling.allowed_updates {
        if tag.parse::<UpdateKind>().is_err() {
            return Err(ConfigError::invalid(
                "polling.allowed_updates",
                format!("unknown update type {tag:?}"),
            ));
        }
    }

    if let Some(retry) = &polling.retry {
        validate_retry_config(retry)?;
    }

    Ok(())
}

/// Validates retry configuration.
fn validate_retry_config(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.initial_delay_ms == 0 {
        return Err(ConfigError::invalid(
            "polling.retry.initial_delay_ms",
            "must be greater than 0",
        ));
    }

    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(ConfigError::invalid(
            "polling.retry.max_delay_ms",
            "must not be below initial_delay_ms",
        ));
    }

    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::invalid(
            "polling.retry.backoff_multiplier",
            "must be a finite number of at least 1.0",
        ));
    }

    Ok(())
}

/// A long poll must end before the HTTP client gives up on it.
fn validate_timeouts(bot: &BotConfig, polling: &PollingConfig) -> ConfigResult<()> {
    if let (Some(request), Some(poll)) = (bot.request_timeout(), polling.timeout_secs) {
        if request.as_secs() <= poll {
            return Err(ConfigError::invalid(
                "bot.request_timeout_secs",
                format!(
                    "{} must exceed polling.timeout_secs ({poll})",
                    request.as_secs()
                ),
            ));
        }
    }

    Ok(())
}
