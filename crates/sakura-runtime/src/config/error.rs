//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded or was rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file passed to [`ConfigLoader::file`](super::ConfigLoader::file) does not exist.
    #[error("configuration file {} not found", .0.display())]
    FileNotFound(PathBuf),

    /// No enabled provider reads files with this extension.
    #[error("no enabled config feature reads `.{extension}` files ({})", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// A source could not be parsed, or the merged value does not fit the schema.
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    /// A required value is empty.
    #[error("`{0}` must be set")]
    Missing(&'static str),

    /// A value is present but unusable.
    #[error("`{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        assert_eq!(
            ConfigError::Missing("bot.token").to_string(),
            "`bot.token` must be set"
        );
        assert_eq!(
            ConfigError::invalid("polling.limit", "must be between 1 and 100").to_string(),
            "`polling.limit` is invalid: must be between 1 and 100"
        );
    }
}
