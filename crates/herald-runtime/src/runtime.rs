//! Runtime wiring for configuration, logging and deferred dispatch.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use herald_runtime::HeraldRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Auto-loads herald.toml from the current directory
//!     let runtime = HeraldRuntime::new();
//!     let events = runtime.events();
//!
//!     events.on("saved", callback(|inv| { /* ... */ no_reply() }));
//!     events.trigger_defer("saved", vec![json!(42)]);
//!
//!     runtime.shutdown();
//!     Ok(())
//! }
//! ```

use herald_core::{DispatchOptions, Events, Receiver, ScheduleError, Scheduler};
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, HeraldConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the loaded configuration and the scheduler behind `trigger_defer`.
///
/// Every `Events` created through [`HeraldRuntime::events`] shares the same
/// scheduler, so deferred triggers from all of them run in one FIFO order.
#[derive(Debug)]
pub struct HeraldRuntime {
    config: HeraldConfig,
    scheduler: Option<Scheduler>,
}

impl HeraldRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Falls back to default settings if the configuration cannot be loaded
    /// or is invalid.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .load()
            .and_then(|config| validate_config(&config).map(|()| config))
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                HeraldConfig::default()
            });

        Self::start(config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    pub fn from_config(config: &HeraldConfig) -> RuntimeResult<Self> {
        validate_config(config)?;
        Ok(Self::start(config.clone()))
    }

    fn start(config: HeraldConfig) -> Self {
        logging::init_from_config(&config.logging);

        let scheduler = match Scheduler::start(config.dispatch.defer_queue_capacity) {
            Ok(scheduler) => Some(scheduler),
            Err(ScheduleError::NoRuntime) => {
                warn!("No tokio runtime available, deferred triggers will use the caller's runtime");
                None
            }
            Err(err) => {
                warn!(error = %err, "Failed to start scheduler");
                None
            }
        };

        info!(
            log_level = %config.logging.level,
            defer_queue_capacity = config.dispatch.defer_queue_capacity,
            scheduler = scheduler.is_some(),
            "Herald runtime initialized"
        );

        Self { config, scheduler }
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    /// Returns the scheduler, if one was started.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    /// Dispatch options derived from the configuration.
    pub fn dispatch_options(&self) -> DispatchOptions {
        self.config.dispatch.to_options()
    }

    /// Creates a new `Events` wired to this runtime's scheduler and options.
    pub fn events(&self) -> Events {
        let events = Events::new().with_options(self.dispatch_options());
        match &self.scheduler {
            Some(scheduler) => events.with_scheduler(scheduler.clone()),
            None => events,
        }
    }

    /// Like [`events`](Self::events), with `host` as the default listener context.
    pub fn events_with_host(&self, host: Receiver) -> Events {
        self.events().with_host(host)
    }

    /// Stops the scheduler; deferred triggers still queued are dropped.
    pub fn shutdown(&self) {
        if let Some(scheduler) = &self.scheduler {
            debug!(pending = scheduler.pending(), "Shutting down scheduler");
            scheduler.shutdown();
        }
        info!("Herald runtime stopped");
    }
}

impl Default for HeraldRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `HeraldRuntime` with custom configuration.
///
/// ```rust,ignore
/// let runtime = HeraldRuntime::builder()
///     .config_file("config/herald.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration on top of files and environment.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates the configuration, then starts the runtime.
    pub fn build(self) -> RuntimeResult<HeraldRuntime> {
        let config = self.config_loader.load()?;
        HeraldRuntime::from_config(&config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use herald_core::{callback, json, no_reply};
    use tokio::sync::oneshot;

    use super::*;
    use crate::error::RuntimeError;

    #[tokio::test]
    async fn test_events_use_shared_scheduler() {
        let runtime = HeraldRuntime::from_config(&HeraldConfig::default()).unwrap();
        assert!(runtime.scheduler().is_some());

        let first = runtime.events();
        let second = runtime.events();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        {
            let log = Arc::clone(&log);
            first.on(
                "tick",
                callback(move |inv| {
                    log.lock().unwrap().push(inv.args().to_vec());
                    no_reply()
                }),
            );
        }
        {
            let done_tx = Mutex::new(Some(done_tx));
            second.on(
                "tock",
                callback(move |_| {
                    if let Some(tx) = done_tx.lock().unwrap().take() {
                        let _ = tx.send(());
                    }
                    no_reply()
                }),
            );
        }

        first.trigger_defer("tick", vec![json!(1)]);
        second.trigger_defer("tock", vec![]);
        assert!(log.lock().unwrap().is_empty());

        done_rx.await.unwrap();
        assert_eq!(*log.lock().unwrap(), [vec![json!(1)]]);
        runtime.shutdown();
    }

    #[tokio::test]
    async fn test_dispatch_options_from_config() {
        let mut config = HeraldConfig::default();
        config.dispatch.slow_listener_ms = Some(5);
        config.dispatch.defer_queue_capacity = 3;

        let runtime = HeraldRuntime::from_config(&config).unwrap();
        let events = runtime.events();
        assert_eq!(events.options().slow_listener, Some(Duration::from_millis(5)));
        assert_eq!(events.scheduler().map(Scheduler::capacity), Some(3));
        runtime.shutdown();
        assert!(runtime.scheduler().is_some_and(Scheduler::is_closed));
    }

    #[tokio::test]
    async fn test_events_with_host() {
        let runtime = HeraldRuntime::from_config(&HeraldConfig::default()).unwrap();
        let host: Receiver = Arc::new("owner");
        let events = runtime.events_with_host(Arc::clone(&host));
        assert!(events.host().is_some_and(|h| Arc::ptr_eq(h, &host)));
        runtime.shutdown();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = HeraldConfig::default();
        config.dispatch.defer_queue_capacity = 0;
        let err = HeraldRuntime::from_config(&config).unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_without_tokio_runtime_has_no_scheduler() {
        let runtime = HeraldRuntime::from_config(&HeraldConfig::default()).unwrap();
        assert!(runtime.scheduler().is_none());
        assert!(runtime.events().scheduler().is_none());
    }

    #[test]
    fn test_builder_missing_file() {
        let err = HeraldRuntime::builder()
            .config_file("/definitely/not/here/herald.toml")
            .without_env()
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}
