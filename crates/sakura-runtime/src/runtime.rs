//! Runtime orchestration: configuration, transport and the polling loop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sakura_runtime::SakuraRuntime;
//!
//! // Auto-loads sakura.toml from the current directory
//! let runtime = SakuraRuntime::new();
//! runtime.run(on_update).await?;
//!
//! // Custom configuration path
//! let runtime = SakuraRuntime::builder()
//!     .config_file("config/bot.toml")
//!     .profile("production")
//!     .build()?;
//! ```

use std::future::Future;

use parking_lot::RwLock;
use sakura_core::{
    BotInfo, BoxedTransport, CancellationToken, Handler, Poller, TransportExt,
};
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, SakuraConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the configuration and drives one polling loop.
///
/// ```rust,ignore
/// async fn on_update(update: Update) {
///     tracing::info!(id = update.id(), "got update");
/// }
///
/// let runtime = SakuraRuntime::builder().config_file("sakura.toml").build()?;
/// runtime.run(on_update).await?;
/// ```
pub struct SakuraRuntime {
    /// The configuration.
    config: SakuraConfig,
    /// Injected transport; built from `config.bot` when absent.
    transport: Option<BoxedTransport>,
    /// Identity reported by `getMe`, once verified.
    bot_info: RwLock<Option<BotInfo>>,
    /// Parent of every poller's cancellation token.
    cancel: CancellationToken,
}

impl SakuraRuntime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// Falls back to defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                SakuraConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from configuration and initializes logging.
    pub fn from_config(config: &SakuraConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            max_concurrency = config.polling.max_concurrency,
            admins = config.bot.admins.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            transport: None,
            bot_info: RwLock::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `transport` instead of building one from `bot` settings.
    pub fn with_transport(mut self, transport: BoxedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SakuraConfig {
        &self.config
    }

    /// Whether `user_id` is one of the configured `bot.admins`.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.config.bot.is_admin(user_id)
    }

    /// The bot identity, available after a verified start.
    pub fn bot_info(&self) -> Option<BotInfo> {
        self.bot_info.read().clone()
    }

    /// A token that is cancelled when the runtime shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Asks every running poller to stop.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.cancel.cancel();
    }

    /// Validates the configuration, connects, and builds the poller.
    ///
    /// The handler is checked before any request is sent, so an invalid
    /// handler never reaches `getUpdates`.
    pub async fn prepare<H, T>(&self, handler: H) -> RuntimeResult<Poller>
    where
        H: Handler<T>,
        T: 'static,
    {
        validate_config(&self.config)?;

        let polling = &self.config.polling;
        let transport = self.transport()?;

        let mut builder = Poller::builder(transport.clone())
            .max_concurrency(polling.max_concurrency)
            .options(polling.poll_options())
            .initial_offset(polling.initial_offset)
            .shutdown_timeout(polling.shutdown_timeout())
            .cancellation_token(self.cancel.child_token());
        if let Some(retry) = &polling.retry {
            builder = builder.retry(retry.to_core_retry());
        }
        let poller = builder.build(handler)?;

        if self.config.bot.verify_token {
            let me = transport.get_me().await?;
            info!(
                bot_id = me.id,
                username = me.username.as_deref().unwrap_or("<none>"),
                "Token verified"
            );
            *self.bot_info.write() = Some(me);
        }

        Ok(poller)
    }

    /// Runs the polling loop until Ctrl+C or SIGTERM.
    pub async fn run<H, T>(&self, handler: H) -> RuntimeResult<()>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.run_until(handler, shutdown_signal()).await
    }

    /// Runs the polling loop until `shutdown` completes or
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn run_until<H, T, F>(&self, handler: H, shutdown: F) -> RuntimeResult<()>
    where
        H: Handler<T>,
        T: 'static,
        F: Future<Output = ()>,
    {
        let poller = self.prepare(handler).await?;

        info!(
            handler = poller.descriptor().type_name(),
            max_concurrency = poller.pool().max_concurrency(),
            "Sakura runtime is now running. Press Ctrl+C to stop."
        );

        poller.run_until(shutdown).await?;

        info!("Sakura runtime stopped");
        Ok(())
    }

    fn transport(&self) -> RuntimeResult<BoxedTransport> {
        match &self.transport {
            Some(transport) => Ok(transport.clone()),
            None => Ok(sakura_transport::build_transport(
                self.config.bot.to_client_config(),
            )?),
        }
    }
}

impl Default for SakuraRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {e}");
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`SakuraRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    transport: Option<BoxedTransport>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            transport: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: SakuraConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses a custom transport instead of the HTTP client.
    pub fn transport(mut self, transport: BoxedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<SakuraRuntime> {
        let config = self.config_loader.load()?;
        let mut runtime = SakuraRuntime::from_config(&config);
        runtime.transport = self.transport;
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
