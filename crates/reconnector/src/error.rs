//! Error types for the reconnection controller.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building a configuration or constructing a controller.
///
/// These are never surfaced as status notifications: a controller cannot
/// exist without a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No connector was supplied to the builder.
    #[error("a connector is required")]
    MissingConnector,

    /// The delay schedule has no entries.
    #[error("delay schedule must contain at least one entry")]
    EmptySchedule,

    /// A raw delay entry is not a non-negative integer.
    #[error("delay at index {index} must be a non-negative integer, got {value}")]
    InvalidDelay {
        /// Position of the offending entry.
        index: usize,
        /// The rejected value, in milliseconds.
        value: i64,
    },

    /// `max_attempts` was zero.
    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,

    /// The controller was constructed outside a Tokio runtime.
    #[error("reconnect controller must be created inside a Tokio runtime")]
    NoRuntime,
}

/// A failed connection attempt.
///
/// Wraps the connector's error together with the 1-based attempt number
/// within its session. The inner error is shared, so the same failure can be
/// reported by both the terminal `error` event and the `failed` event that
/// follows it.
pub struct ConnectionError<E> {
    attempt: u32,
    source: Arc<E>,
}

impl<E> ConnectionError<E> {
    pub(crate) fn new(attempt: u32, source: E) -> Self {
        Self {
            attempt,
            source: Arc::new(source),
        }
    }

    /// Returns the 1-based attempt number that failed.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the connector's error.
    pub fn inner(&self) -> &E {
        &self.source
    }

    /// Returns a shared handle to the connector's error.
    pub fn into_inner(self) -> Arc<E> {
        self.source
    }
}

impl<E> Clone for ConnectionError<E> {
    fn clone(&self) -> Self {
        Self {
            attempt: self.attempt,
            source: Arc::clone(&self.source),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for ConnectionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionError")
            .field("attempt", &self.attempt)
            .field("source", &self.source)
            .finish()
    }
}

impl<E: fmt::Display> fmt::Display for ConnectionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connection attempt {} failed: {}",
            self.attempt, self.source
        )
    }
}

impl<E> std::error::Error for ConnectionError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
