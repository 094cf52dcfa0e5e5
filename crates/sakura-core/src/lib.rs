//! # Sakura Core
//!
//! The polling engine of the Sakura bot toolkit.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Update Model**: opaque payloads keyed by `update_id` ([`Update`], [`UpdateKind`])
//! - **Transport Seam**: request/response exchange with the API ([`Transport`], [`ApiResponse`])
//! - **Errors**: one enum per layer ([`ContractError`], [`SourceError`], [`DispatchError`], ...)
//!
//! ### Framework Layer
//!
//! - **Handlers**: async functions with extracted parameters ([`Handler`], [`FromUpdate`])
//! - **Contract**: single structured parameter, checked once ([`HandlerContract`])
//! - **Cursor**: never requests an update twice ([`PollCursor`])
//! - **Source**: one `getUpdates` call per fetch ([`UpdateSource`])
//! - **Pool**: bounded concurrent execution ([`WorkerPool`])
//! - **Loop**: fetch, advance, admit, repeat ([`Poller`])
//!
//! ```text
//! ┌──────────────┐  batch  ┌────────┐ observe ┌────────────┐ submit ┌────────────┐
//! │ UpdateSource │────────▶│ Poller │────────▶│ PollCursor │        │ WorkerPool │
//! └──────────────┘         └────────┘─────────────────────────────▶└────────────┘
//!        ▲                      │                                        │
//!        └──── next offset ─────┘                                  handler task
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sakura_core::{Poller, Update};
//!
//! async fn on_update(update: Update) {
//!     println!("update {}", update.update_id);
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = /* any Arc<dyn Transport> */;
//!     Poller::new(on_update, 10, transport)?.run().await?;
//!     Ok(())
//! }
//! ```

extern crate self as sakura_core;

// Architectural layers
pub mod foundation;
pub mod framework;

// Re-export foundation types
pub use foundation::{
    ApiError, ApiResponse, ApiResult, BotInfo, BoxedTransport, ContractError, DEFAULT_API_URL,
    DEFAULT_USER_AGENT, DispatchError, DispatchResult, ExtractError, ExtractResult,
    HttpClientConfig, PollerError, PollerResult, SourceError, SourceResult, Transport,
    TransportError, TransportExt, TransportResult, Update, UpdateKind,
};

// Re-export framework types
pub use framework::{
    BoxedHandler, DEFAULT_INITIAL_OFFSET, DEFAULT_MAX_CONCURRENCY, DEFAULT_SHUTDOWN_TIMEOUT,
    FromUpdate, GET_UPDATES, HandleResponse, Handler, HandlerContract, HandlerDescriptor,
    HandlerSignature, ParamInfo, ParamKind, PollCursor, PollOptions, PollOutcome, Poller,
    PollerBuilder, RetryConfig, StructuredKind, UpdateSource, ValidatedHandler, WorkerPool,
    into_handler,
};

pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{
        FromUpdate, HandleResponse, Handler, ParamKind, Poller, PollerBuilder, RetryConfig,
    };
}
