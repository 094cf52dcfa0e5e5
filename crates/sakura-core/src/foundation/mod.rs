//! Foundation layer: the update model, the transport seam and error types.

pub mod error;
pub mod transport;
pub mod update;

pub use error::*;
pub use transport::{
    ApiResponse, BotInfo, BoxedTransport, DEFAULT_API_URL, DEFAULT_USER_AGENT, HttpClientConfig,
    Transport, TransportExt,
};
pub use update::{Update, UpdateKind};
