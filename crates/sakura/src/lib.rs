//! # Sakura
//!
//! A long-polling Telegram bot toolkit with bounded-concurrency update dispatch.
//!
//! ## Overview
//!
//! Sakura repeatedly asks the Bot API for updates past a cursor, hands each
//! update to a single user handler, and runs handlers concurrently up to a
//! fixed cap. The handler's parameter type is checked once, before the first
//! request is sent.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  getUpdates  ┌────────┐  submit  ┌────────────┐
//! │  Transport  │◀─────────────│ Poller │─────────▶│ WorkerPool │──▶ handler(update)
//! │   (HTTP)    │─────────────▶│ cursor │          │ (N slots)  │
//! └─────────────┘    batch     └────────┘          └────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, verifies the token, runs until Ctrl+C
//! - **Transport**: one JSON request per Bot API method
//! - **Poller**: owns the offset cursor and never requests an update twice
//! - **Handlers**: async functions taking one structured parameter
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sakura::prelude::*;
//!
//! #[derive(Deserialize, UpdatePayload)]
//! #[update(field = "message", crate = "sakura::core")]
//! struct Message {
//!     text: Option<String>,
//! }
//!
//! async fn on_message(message: Message) {
//!     tracing::info!(text = ?message.text, "message received");
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     SakuraRuntime::new().run(on_message).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `http-client`: reqwest-based HTTP transport (default)

pub use sakura_core as core;
pub use sakura_macros::UpdatePayload;
pub use sakura_runtime as runtime;
pub use sakura_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use sakura::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use sakura_runtime::{RuntimeError, RuntimeResult, SakuraRuntime};

    // Handler parameters
    pub use sakura_core::{FromUpdate, Update, UpdateKind};
    pub use sakura_macros::UpdatePayload;

    // Polling engine, for use without the runtime
    pub use sakura_core::{CancellationToken, Poller, PollerBuilder, RetryConfig};

    // Calling the Bot API from handlers
    pub use sakura_core::{BoxedTransport, Transport, TransportExt};
}
