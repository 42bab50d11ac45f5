//! Error types for the Herald dispatch engine.

use thiserror::Error;

/// Errors that can surface from a trigger call.
///
/// Listener bodies report failures with [`anyhow::Error`]; the dispatcher
/// attaches the event name the listener was invoked for.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A listener returned an error while being invoked.
    #[error("listener for '{event}' failed: {source}")]
    Listener {
        /// The event the listener was invoked for.
        event: String,
        /// The listener's error.
        #[source]
        source: anyhow::Error,
    },

    /// A deferred reply collected by `trigger_then` completed with an error.
    #[error("deferred reply for '{event}' failed: {source}")]
    Deferred {
        /// The event whose listener produced the deferred reply.
        event: String,
        /// The deferred reply's error.
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// Creates a listener error for the given event.
    pub fn listener(event: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Listener {
            event: event.into(),
            source,
        }
    }

    /// Creates a deferred-reply error for the given event.
    pub fn deferred(event: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Deferred {
            event: event.into(),
            source,
        }
    }

    /// Returns the event name this error was raised for.
    pub fn event(&self) -> &str {
        match self {
            Self::Listener { event, .. } | Self::Deferred { event, .. } => event,
        }
    }
}

/// Errors raised by the deferred-call scheduler.
#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    /// The scheduler queue is at capacity.
    #[error("scheduler queue is full ({capacity} pending calls)")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The scheduler worker has shut down.
    #[error("scheduler has shut down")]
    Closed,

    /// No tokio runtime is available to run the scheduler on.
    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Result type for trigger operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for scheduler operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;
