//! Controller status values and the events that announce them.

use crate::error::ConnectionError;
use reconnector_core::events::ControllerEvent;
use std::fmt;
use std::time::Instant;

/// Externally visible state of a reconnection controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not connected and not trying to connect. Initial state.
    Idle,

    /// A session is running: an attempt is in flight or a backoff is pending.
    Connecting,

    /// The connector succeeded.
    Connected,

    /// Connectivity was reported lost; a new session follows immediately.
    Disconnected,

    /// One attempt failed. Informational; the session may continue.
    Error,

    /// The session was abandoned by `stop()`. Settles to `Idle`.
    Stopped,

    /// The attempt budget was exhausted. Settles to `Idle`.
    Failed,
}

impl Status {
    /// Lowercase name of this status, also used as the event type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnected => "disconnected",
            Status::Error => "error",
            Status::Stopped => "stopped",
            Status::Failed => "failed",
        }
    }

    pub(crate) fn encode(self) -> u8 {
        match self {
            Status::Idle => 0,
            Status::Connecting => 1,
            Status::Connected => 2,
            Status::Disconnected => 3,
            Status::Error => 4,
            Status::Stopped => 5,
            Status::Failed => 6,
        }
    }

    pub(crate) fn decode(encoded: u8) -> Self {
        match encoded {
            1 => Status::Connecting,
            2 => Status::Connected,
            3 => Status::Disconnected,
            4 => Status::Error,
            5 => Status::Stopped,
            6 => Status::Failed,
            _ => Status::Idle,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered for every status transition.
///
/// `T` is the connection type produced by the connector and `E` its error
/// type. The connection is moved into the `Connected` event and handed to
/// the status observer; the controller keeps no reference to it.
pub enum StatusEvent<T, E> {
    /// The controller settled back to idle.
    Idle {
        controller_name: String,
        timestamp: Instant,
        /// `Failed` after an exhausted session; otherwise the status that
        /// `stop()` interrupted.
        previous: Status,
    },

    /// A new session began.
    Connecting {
        controller_name: String,
        timestamp: Instant,
        session_start: Instant,
    },

    /// The connector produced a connection.
    Connected {
        controller_name: String,
        timestamp: Instant,
        connection: T,
        /// Successful connections since creation or the last `stop()`.
        success_count: u64,
        /// Attempts this session took, including the successful one.
        attempts: u32,
    },

    /// Connectivity was reported lost.
    Disconnected {
        controller_name: String,
        timestamp: Instant,
    },

    /// An attempt failed.
    Error {
        controller_name: String,
        timestamp: Instant,
        error: ConnectionError<E>,
        session_start: Instant,
        /// 1-based number of the failed attempt within the session.
        count: u32,
        /// True when no further attempt will be made this session.
        terminal: bool,
    },

    /// The session was abandoned.
    Stopped {
        controller_name: String,
        timestamp: Instant,
        /// Status that `stop()` interrupted.
        previous: Status,
    },

    /// The attempt budget was exhausted.
    Failed {
        controller_name: String,
        timestamp: Instant,
        /// The error of the final attempt.
        error: ConnectionError<E>,
        session_start: Instant,
        attempts: u32,
    },
}

impl<T, E> StatusEvent<T, E> {
    /// Returns the status this event announces.
    pub fn status(&self) -> Status {
        match self {
            StatusEvent::Idle { .. } => Status::Idle,
            StatusEvent::Connecting { .. } => Status::Connecting,
            StatusEvent::Connected { .. } => Status::Connected,
            StatusEvent::Disconnected { .. } => Status::Disconnected,
            StatusEvent::Error { .. } => Status::Error,
            StatusEvent::Stopped { .. } => Status::Stopped,
            StatusEvent::Failed { .. } => Status::Failed,
        }
    }

    /// Consumes the event, returning the connection if it carries one.
    pub fn into_connection(self) -> Option<T> {
        match self {
            StatusEvent::Connected { connection, .. } => Some(connection),
            _ => None,
        }
    }

    /// Returns the connection error if this is an `Error` or `Failed` event.
    pub fn error(&self) -> Option<&ConnectionError<E>> {
        match self {
            StatusEvent::Error { error, .. } | StatusEvent::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<T, E> ControllerEvent for StatusEvent<T, E>
where
    T: Send,
    E: fmt::Debug + Send + Sync,
{
    fn event_type(&self) -> &'static str {
        self.status().as_str()
    }

    fn timestamp(&self) -> Instant {
        match self {
            StatusEvent::Idle { timestamp, .. }
            | StatusEvent::Connecting { timestamp, .. }
            | StatusEvent::Connected { timestamp, .. }
            | StatusEvent::Disconnected { timestamp, .. }
            | StatusEvent::Error { timestamp, .. }
            | StatusEvent::Stopped { timestamp, .. }
            | StatusEvent::Failed { timestamp, .. } => *timestamp,
        }
    }

    fn controller_name(&self) -> &str {
        match self {
            StatusEvent::Idle {
                controller_name, ..
            }
            | StatusEvent::Connecting {
                controller_name, ..
            }
            | StatusEvent::Connected {
                controller_name, ..
            }
            | StatusEvent::Disconnected {
                controller_name, ..
            }
            | StatusEvent::Error {
                controller_name, ..
            }
            | StatusEvent::Stopped {
                controller_name, ..
            }
            | StatusEvent::Failed {
                controller_name, ..
            } => controller_name,
        }
    }
}

// Connections are opaque, so only their presence is printed.
impl<T, E: fmt::Debug> fmt::Debug for StatusEvent<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Idle {
                controller_name,
                previous,
                ..
            } => f
                .debug_struct("Idle")
                .field("controller_name", controller_name)
                .field("previous", previous)
                .finish(),
            StatusEvent::Connecting {
                controller_name,
                session_start,
                ..
            } => f
                .debug_struct("Connecting")
                .field("controller_name", controller_name)
                .field("session_start", session_start)
                .finish(),
            StatusEvent::Connected {
                controller_name,
                success_count,
                attempts,
                ..
            } => f
                .debug_struct("Connected")
                .field("controller_name", controller_name)
                .field("connection", &"..")
                .field("success_count", success_count)
                .field("attempts", attempts)
                .finish(),
            StatusEvent::Disconnected {
                controller_name, ..
            } => f
                .debug_struct("Disconnected")
                .field("controller_name", controller_name)
                .finish(),
            StatusEvent::Error {
                controller_name,
                error,
                count,
                terminal,
                ..
            } => f
                .debug_struct("Error")
                .field("controller_name", controller_name)
                .field("error", error)
                .field("count", count)
                .field("terminal", terminal)
                .finish(),
            StatusEvent::Stopped {
                controller_name,
                previous,
                ..
            } => f
                .debug_struct("Stopped")
                .field("controller_name", controller_name)
                .field("previous", previous)
                .finish(),
            StatusEvent::Failed {
                controller_name,
                error,
                attempts,
                ..
            } => f
                .debug_struct("Failed")
                .field("controller_name", controller_name)
                .field("error", error)
                .field("attempts", attempts)
                .finish(),
        }
    }
}
