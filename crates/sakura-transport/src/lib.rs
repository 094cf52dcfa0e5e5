//! # Sakura Transport
//!
//! Concrete [`Transport`](sakura_core::Transport) implementations for the
//! Sakura bot toolkit.
//!
//! ## Features
//!
//! - `http-client`: HTTP client transport over `reqwest`
//! - `full`: All transports
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Poller / handlers  │
//! ├─────────────────────┤
//! │  sakura-core        │  (Transport trait)
//! ├─────────────────────┤
//! │  sakura-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sakura_core::HttpClientConfig;
//! use sakura_transport::http::HttpTransport;
//!
//! let transport = HttpTransport::new(
//!     HttpClientConfig::new("123456:ABC").timeout(Duration::from_secs(40)),
//! )?;
//! ```

pub mod http;

use sakura_core::{BoxedTransport, HttpClientConfig, TransportResult};

/// Builds the default transport for `config`.
///
/// Fails with [`TransportError::NotAvailable`](sakura_core::TransportError::NotAvailable)
/// when the `http-client` feature is disabled.
pub fn build_transport(config: HttpClientConfig) -> TransportResult<BoxedTransport> {
    #[cfg(feature = "http-client")]
    {
        Ok(std::sync::Arc::new(http::HttpTransport::new(config)?))
    }

    #[cfg(not(feature = "http-client"))]
    {
        drop(config);
        Err(sakura_core::TransportError::NotAvailable {
            transport: "http-client",
        })
    }
}
