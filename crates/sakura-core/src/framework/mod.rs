//! Framework layer - the polling engine.
//!
//! This module contains the retrieval-and-dispatch pipeline:
//! - Handler trait and parameter extraction (Axum-style)
//! - Handler contract validation, run once before polling starts
//! - Poll cursor, update source and bounded worker pool
//! - The event loop tying them together

pub mod contract;
pub mod cursor;
pub mod extractor;
pub mod handler;
pub mod poller;
pub mod pool;
pub mod source;

pub use contract::{HandlerContract, HandlerDescriptor, StructuredKind, ValidatedHandler};
pub use cursor::PollCursor;
pub use extractor::{FromUpdate, ParamKind};
pub use handler::{
    BoxedHandler, HandleResponse, Handler, HandlerSignature, ParamInfo, into_handler,
};
pub use poller::{
    DEFAULT_INITIAL_OFFSET, DEFAULT_SHUTDOWN_TIMEOUT, PollOutcome, Poller, PollerBuilder,
    RetryConfig,
};
pub use pool::{DEFAULT_MAX_CONCURRENCY, WorkerPool};
pub use source::{GET_UPDATES, PollOptions, UpdateSource};
