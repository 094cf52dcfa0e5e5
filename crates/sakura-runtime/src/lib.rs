//! Sakura Runtime - Orchestration layer for the Sakura bot toolkit.
//!
//! This crate provides:
//! - Configuration loading and validation (`config`)
//! - Logging setup (`logging`)
//! - Runtime orchestration (`SakuraRuntime`): token verification, transport
//!   construction, and a polling loop that stops on Ctrl+C or SIGTERM
//!
//! ```ignore
//! use sakura_runtime::SakuraRuntime;
//! use sakura_core::Update;
//!
//! async fn on_update(update: Update) {
//!     tracing::info!(id = update.id(), "update received");
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SakuraRuntime::new();
//!     runtime.run(on_update).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PollingConfig,
    SakuraConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, SakuraRuntime, shutdown_signal};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Instrument, Level, debug, error, info, info_span, trace, warn};
}
