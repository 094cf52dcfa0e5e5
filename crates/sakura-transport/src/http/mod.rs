//! HTTP transport.
//!
//! This module provides the HTTP client implementation of
//! [`Transport`](sakura_core::Transport).

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::HttpTransport;
