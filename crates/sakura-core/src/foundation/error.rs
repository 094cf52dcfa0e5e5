//! Unified error types for the Sakura core.
//!
//! Each layer gets its own error enum so callers can tell a bad handler
//! signature (fatal at setup) apart from a failed fetch (retried) or a failed
//! dispatch (fatal at runtime).

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors produced by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote answered with a non-success status and a body that is not an
    /// API envelope.
    #[error("HTTP {status} error: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body (possibly truncated).
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// Invalid transport configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// Transport not available (feature disabled or nothing injected).
    #[error("transport '{transport}' not available")]
    NotAvailable {
        /// The transport type that's not available.
        transport: &'static str,
    },

    /// I/O or connection error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors from a typed API call (envelope unpacked).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The envelope reported `ok = false`.
    #[error("API error ({}): {description}", display_code(.code))]
    NotOk {
        /// Remote error code, when reported.
        code: Option<i64>,
        /// Remote description.
        description: String,
    },

    /// The envelope reported success but carried no `result`.
    #[error("API response for '{method}' has no result")]
    MissingResult {
        /// The method that was called.
        method: String,
    },

    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn display_code(code: &Option<i64>) -> String {
    code.map_or_else(|| "?".to_string(), |c| c.to_string())
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors raised while turning an [`Update`](crate::Update) into a handler
/// parameter.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The update has no such top-level field.
    #[error("update has no '{field}' field")]
    MissingField {
        /// The field that was looked up.
        field: &'static str,
    },

    /// The update (or field) does not deserialize into the requested type.
    #[error("cannot deserialize update into '{type_name}': {reason}")]
    Deserialize {
        /// Target type name.
        type_name: &'static str,
        /// Serde's message.
        reason: String,
    },

    /// The parameter type cannot be built from an update at all.
    #[error("'{type_name}' cannot be extracted from an update")]
    Unsupported {
        /// The parameter type name.
        type_name: &'static str,
    },
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

// =============================================================================
// Handler Contract Errors
// =============================================================================

/// A handler was rejected before the poller started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The handler does not take exactly one parameter.
    #[error("the update handler must accept exactly one parameter, {found} given")]
    InvalidArity {
        /// Number of parameters the handler declares.
        found: usize,
    },

    /// The parameter is dynamically typed, so its shape is unknown.
    #[error("the type of handler parameter '{type_name}' must be declared")]
    UndeclaredParameterType {
        /// The parameter type name.
        type_name: &'static str,
    },

    /// The parameter is neither a structured record nor a structured map.
    #[error("the handler parameter must be a structured record or map, '{type_name}' given")]
    UnsupportedParameterType {
        /// The parameter type name.
        type_name: &'static str,
    },
}

// =============================================================================
// Source / Dispatch / Poller Errors
// =============================================================================

/// A single failed `getUpdates` call.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The transport failed (network, timeout, undecodable body).
    #[error("failed to fetch updates: {0}")]
    Transport(#[from] TransportError),

    /// The remote answered with `ok = false`.
    #[error("failed to fetch updates: {description}")]
    Remote {
        /// Remote error code, when reported.
        code: Option<i64>,
        /// Remote description.
        description: String,
    },

    /// The envelope was successful but the result is not a list of updates.
    #[error("malformed getUpdates response: {0}")]
    Malformed(String),
}

impl From<ApiError> for SourceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotOk { code, description } => Self::Remote { code, description },
            ApiError::MissingResult { method } => {
                Self::Malformed(format!("'{method}' returned no result"))
            }
            ApiError::Serialization(reason) => Self::Malformed(reason),
            ApiError::Transport(e) => Self::Transport(e),
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// A unit of work could not be handed to the worker pool.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Admission was closed while waiting for a slot.
    #[error("worker pool is closed")]
    Closed,

    /// No runtime to spawn the task on.
    #[error("cannot spawn handler task: {0}")]
    Spawn(String),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that stop a [`Poller`](crate::Poller) from being built or running.
#[derive(Debug, Clone, Error)]
pub enum PollerError {
    /// The handler failed validation.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// `max_concurrency` must be at least 1.
    #[error("max_concurrency must be at least 1")]
    InvalidConcurrency,

    /// The retry backoff settings cannot produce a delay sequence.
    #[error("invalid retry settings: {0}")]
    InvalidRetry(String),

    /// A fetched update could not be dispatched.
    #[error("dispatch failed at offset {offset}: {source}")]
    Dispatch {
        /// Cursor position when the dispatch failed.
        offset: i64,
        /// The underlying failure.
        #[source]
        source: DispatchError,
    },
}

/// Result type for poller operations.
pub type PollerResult<T> = Result<T, PollerError>;

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for typed API calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_maps_into_source_error() {
        let err: SourceError = ApiError::NotOk {
            code: Some(409),
            description: "Conflict: terminated by other getUpdates request".into(),
        }
        .into();
        assert!(matches!(err, SourceError::Remote { code: Some(409), .. }));

        let err: SourceError = ApiError::Transport(TransportError::Timeout).into();
        assert!(matches!(err, SourceError::Transport(TransportError::Timeout)));
    }

    #[test]
    fn test_not_ok_display_without_code() {
        let err = ApiError::NotOk {
            code: None,
            description: "Unauthorized".into(),
        };
        assert_eq!(err.to_string(), "API error (?): Unauthorized");
    }
}
