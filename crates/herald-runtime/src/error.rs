//! Runtime error types.

use herald_core::ScheduleError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running the herald runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The deferred-trigger scheduler could not be started.
    #[error("Scheduler error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
