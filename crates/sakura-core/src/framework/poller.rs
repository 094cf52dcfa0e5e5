//! The event loop.
//!
//! A [`Poller`] repeatedly fetches a batch from its [`UpdateSource`], advances
//! its [`PollCursor`] past each update and admits the update to its
//! [`WorkerPool`]. The next fetch starts as soon as the batch has been
//! admitted; it does not wait for handlers to finish.
//!
//! The cursor moves before the handler runs. An update whose handler has not
//! finished when the process dies is not requested again.
//!
//! # Example
//!
//! ```rust,ignore
//! use sakura_core::{Poller, Update};
//!
//! async fn on_update(update: Update) {
//!     tracing::info!(id = update.update_id, "received");
//! }
//!
//! let poller = Poller::builder(transport)
//!     .max_concurrency(10)
//!     .timeout(Duration::from_secs(30))
//!     .build(on_update)?;
//! poller.run().await?;
//! ```

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::contract::{HandlerContract, HandlerDescriptor, ValidatedHandler};
use super::cursor::PollCursor;
use super::handler::Handler;
use super::pool::{DEFAULT_MAX_CONCURRENCY, WorkerPool};
use super::source::{PollOptions, UpdateSource};
use crate::foundation::{
    BoxedTransport, DispatchError, PollerError, PollerResult, SourceError, SourceResult, Update,
};

/// Offset of the very first fetch: only the most recent pending update.
pub const DEFAULT_INITIAL_OFFSET: i64 = -1;

/// Default upper bound on waiting for in-flight handlers at shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Retry
// ============================================================================

/// Exponential backoff between failed fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
    /// Factor applied after each consecutive failure.
    pub multiplier: f64,
}

impl RetryConfig {
    /// Checks that the settings yield a non-decreasing, bounded sequence.
    pub fn validate(&self) -> PollerResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PollerError::InvalidRetry(format!(
                "multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(PollerError::InvalidRetry(format!(
                "initial_delay ({:?}) exceeds max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Tracks consecutive fetch failures.
#[derive(Debug, Clone)]
struct Backoff {
    config: Option<RetryConfig>,
    current: Option<Duration>,
}

impl Backoff {
    fn new(config: Option<RetryConfig>) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Delay before the next attempt; `None` means retry immediately.
    fn next_delay(&mut self) -> Option<Duration> {
        let config = self.config.as_ref()?;
        let delay = match self.current {
            None => config.initial_delay,
            // Saturates on overflow
            Some(prev) => Duration::try_from_secs_f64(prev.as_secs_f64() * config.multiplier)
                .unwrap_or(config.max_delay),
        };
        let delay = delay.min(config.max_delay);
        self.current = Some(delay);
        Some(delay)
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

// ============================================================================
// Poller
// ============================================================================

/// What a single fetch-and-dispatch cycle did.
#[derive(Debug)]
pub enum PollOutcome {
    /// A non-empty batch was fetched and every update admitted.
    Dispatched(usize),
    /// The fetch returned no updates.
    Empty,
    /// The fetch failed; the cursor is unchanged.
    SourceFailed(SourceError),
}

/// The long-polling event loop.
pub struct Poller {
    source: UpdateSource,
    cursor: PollCursor,
    pool: WorkerPool,
    handler: ValidatedHandler,
    backoff: Backoff,
    cancel: CancellationToken,
    shutdown_timeout: Option<Duration>,
}

impl Poller {
    /// Validates `handler` and creates a poller with default options.
    pub fn new<H, T>(
        handler: H,
        max_concurrency: usize,
        transport: BoxedTransport,
    ) -> PollerResult<Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        Self::builder(transport)
            .max_concurrency(max_concurrency)
            .build(handler)
    }

    /// Starts configuring a poller.
    pub fn builder(transport: BoxedTransport) -> PollerBuilder {
        PollerBuilder::new(transport)
    }

    /// What validation learned about the handler.
    pub fn descriptor(&self) -> &HandlerDescriptor {
        self.handler.descriptor()
    }

    /// The offset of the next fetch.
    pub fn offset(&self) -> i64 {
        self.cursor.offset()
    }

    /// The worker pool.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The options sent with every fetch.
    pub fn options(&self) -> &PollOptions {
        self.source.options()
    }

    /// A handle that stops [`run`](Self::run) when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetches one batch and dispatches it.
    ///
    /// Source failures are reported in the outcome; only a dispatch failure
    /// is an error.
    pub async fn poll_once(&mut self) -> PollerResult<PollOutcome> {
        let fetched = self.source.fetch(self.cursor.offset()).await;
        self.process(fetched).await
    }

    /// Runs the loop until the cancellation token fires, then drains
    /// in-flight handlers.
    ///
    /// Returns `Err` only if an update could not be dispatched.
    pub async fn run(mut self) -> PollerResult<()> {
        let cancel = self.cancel.clone();

        info!(
            offset = self.cursor.offset(),
            max_concurrency = self.pool.max_concurrency(),
            handler = self.handler.descriptor().type_name(),
            "Poller started"
        );

        let result = loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                fetched = self.source.fetch(self.cursor.offset()) => fetched,
            };

            match self.process(fetched).await {
                Ok(PollOutcome::SourceFailed(_)) => {
                    if let Some(delay) = self.backoff.next_delay() {
                        debug!(?delay, "Backing off before next fetch");
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break Ok(()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                Ok(_) => self.backoff.reset(),
                Err(e) => break Err(e),
            }
        };

        self.shutdown().await;
        result
    }

    /// Runs the loop until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> PollerResult<()>
    where
        F: Future<Output = ()>,
    {
        let cancel = self.cancel.clone();
        let run = self.run();
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => result,
            _ = shutdown => {
                cancel.cancel();
                run.await
            }
        }
    }

    async fn process(&mut self, fetched: SourceResult<Vec<Update>>) -> PollerResult<PollOutcome> {
        match fetched {
            Ok(batch) if batch.is_empty() => Ok(PollOutcome::Empty),
            Ok(batch) => {
                let count = batch.len();
                self.dispatch(batch).await?;
                Ok(PollOutcome::Dispatched(count))
            }
            Err(e) => {
                warn!(offset = self.cursor.offset(), error = %e, "Fetch failed, retrying");
                Ok(PollOutcome::SourceFailed(e))
            }
        }
    }

    /// Admits the batch in order. Stops early, without error, once the
    /// cancellation token fires; the rest of the batch is left for the next
    /// process, since no later fetch confirms it to the server.
    async fn dispatch(&mut self, batch: Vec<Update>) -> PollerResult<()> {
        for update in batch {
            let update_id = update.update_id;
            let offset = self.cursor.observe(update_id);
            let span = info_span!("update", update_id, kind = update.kind().map(|k| k.as_str()));
            let task = (self.handler.handler())(Arc::new(update)).instrument(span);

            let submitted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(update_id, "Cancelled while waiting for a free slot");
                    return Ok(());
                }
                submitted = self.pool.submit(task) => submitted,
            };

            match submitted {
                Ok(()) => {}
                Err(DispatchError::Closed) if self.cancel.is_cancelled() => return Ok(()),
                Err(source) => return Err(PollerError::Dispatch { offset, source }),
            }
        }
        Ok(())
    }

    async fn shutdown(&self) {
        info!(
            offset = self.cursor.offset(),
            in_flight = self.pool.in_flight(),
            "Poller stopping"
        );
        if !self.pool.drain(self.shutdown_timeout).await {
            warn!("Handlers still running after shutdown timeout");
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("cursor", &self.cursor)
            .field("pool", &self.pool)
            .field("handler", &self.handler)
            .field("options", self.source.options())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PollerBuilder
// ============================================================================

/// Builder for [`Poller`].
pub struct PollerBuilder {
    transport: BoxedTransport,
    max_concurrency: usize,
    options: PollOptions,
    initial_offset: i64,
    retry: Option<RetryConfig>,
    cancel: Option<CancellationToken>,
    shutdown_timeout: Option<Duration>,
}

impl PollerBuilder {
    /// Creates a builder with default settings.
    pub fn new(transport: BoxedTransport) -> Self {
        Self {
            transport,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            options: PollOptions::default(),
            initial_offset: DEFAULT_INITIAL_OFFSET,
            retry: None,
            cancel: None,
            shutdown_timeout: Some(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }

    /// Maximum number of handlers running at once. Must be at least 1.
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Restricts the update tags the server sends.
    pub fn allowed_updates<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.allowed_updates = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Long-poll timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Maximum batch size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Replaces all fetch options at once.
    pub fn options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    /// Offset of the first fetch.
    pub fn initial_offset(mut self, offset: i64) -> Self {
        self.initial_offset = offset;
        self
    }

    /// Backs off exponentially between failed fetches instead of retrying
    /// immediately.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Upper bound on draining at shutdown; `None` waits indefinitely.
    pub fn shutdown_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validates `handler` and builds the poller.
    pub fn build<H, T>(self, handler: H) -> PollerResult<Poller>
    where
        H: Handler<T>,
        T: 'static,
    {
        let handler = HandlerContract::bind(handler)?;
        let max_concurrency =
            NonZeroUsize::new(self.max_concurrency).ok_or(PollerError::InvalidConcurrency)?;

        debug!(
            handler = handler.descriptor().type_name(),
            kind = %handler.descriptor().kind(),
            "Update handler accepted"
        );

        match &self.retry {
            Some(retry) => retry.validate()?,
            None => {
                debug!("No retry backoff configured, failed fetches are retried immediately")
            }
        }

        Ok(Poller {
            source: UpdateSource::new(self.transport, self.options),
            cursor: PollCursor::new(self.initial_offset),
            pool: WorkerPool::new(max_concurrency),
            handler,
            backoff: Backoff::new(self.retry),
            cancel: self.cancel.unwrap_or_default(),
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}
