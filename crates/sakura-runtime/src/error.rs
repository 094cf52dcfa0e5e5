//! Runtime error types.

use sakura_core::{ApiError, PollerError, TransportError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport could not be constructed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An API call made by the runtime itself failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The polling loop could not be built or stopped with an error.
    #[error("Poller error: {0}")]
    Poller(#[from] PollerError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
