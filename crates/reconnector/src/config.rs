use crate::connector::Connector;
use crate::error::{ConfigError, ConnectionError};
use crate::schedule::DelaySchedule;
use crate::status::{Status, StatusEvent};
use reconnector_core::events::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default attempt budget per session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Status event type produced for a connector `C`.
pub type EventFor<C> = StatusEvent<<C as Connector>::Connection, <C as Connector>::Error>;

/// Owning status observer: receives every event by value, in order.
pub type StatusObserver<C> = Arc<dyn Fn(Status, EventFor<C>) + Send + Sync>;

/// Configuration for a reconnection controller.
///
/// Immutable once built. Construct with [`ReconnectConfig::builder`].
pub struct ReconnectConfig<C: Connector> {
    pub(crate) name: String,

    /// Attempts allowed per session before the controller reports `failed`.
    pub(crate) max_attempts: u32,

    /// Waits between attempts within a session.
    pub(crate) schedule: DelaySchedule,

    pub(crate) connector: C,

    /// Optional callback receiving every event by value.
    pub(crate) on_status: Option<StatusObserver<C>>,

    /// Per-status listeners; these see events by reference, before `on_status`.
    pub(crate) event_listeners: EventListeners<EventFor<C>>,
}

impl<C: Connector> std::fmt::Debug for ReconnectConfig<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectConfig")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("schedule", &self.schedule)
            .field("on_status", &self.on_status.is_some())
            .field("event_listeners", &self.event_listeners.len())
            .finish()
    }
}

impl<C: Connector> ReconnectConfig<C> {
    /// Creates a new builder for configuring reconnection behavior.
    pub fn builder() -> ReconnectConfigBuilder<C> {
        ReconnectConfigBuilder::new()
    }

    /// Returns the controller name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attempt budget per session.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff schedule.
    pub fn schedule(&self) -> &DelaySchedule {
        &self.schedule
    }

    /// Returns the connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }
}

/// Builder for constructing a [`ReconnectConfig`].
///
/// Set the connector first so that listener closures can infer the
/// connection and error types.
pub struct ReconnectConfigBuilder<C: Connector> {
    name: String,
    max_attempts: u32,
    schedule: Result<DelaySchedule, ConfigError>,
    connector: Option<C>,
    on_status: Option<StatusObserver<C>>,
    event_listeners: EventListeners<EventFor<C>>,
}

impl<C: Connector> std::fmt::Debug for ReconnectConfigBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectConfigBuilder")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("schedule", &self.schedule)
            .field("connector", &self.connector.is_some())
            .field("on_status", &self.on_status.is_some())
            .field("event_listeners", &self.event_listeners.len())
            .finish()
    }
}

impl<C: Connector> Default for ReconnectConfigBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ReconnectConfigBuilder<C> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 10
    /// - delays: 100ms, 1s, 5s, 30s
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            schedule: Ok(DelaySchedule::default()),
            connector: None,
            on_status: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the connector. Required.
    pub fn connector(mut self, connector: C) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the name for this controller (used in events, logs and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the attempt budget per session. Must be at least 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use reconnector::ReconnectConfig;
    ///
    /// let config = ReconnectConfig::builder()
    ///     .connector(|| async { Ok::<_, std::io::Error>(()) })
    ///     .max_attempts(5)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_attempts(), 5);
    /// ```
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Uses a single delay between every attempt.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.schedule = Ok(DelaySchedule::fixed(delay));
        self
    }

    /// Sets the backoff schedule from durations.
    pub fn delays<I>(mut self, delays: I) -> Self
    where
        I: IntoIterator<Item = Duration>,
    {
        self.schedule = DelaySchedule::new(delays);
        self
    }

    /// Sets the backoff schedule from raw milliseconds.
    ///
    /// Negative entries are reported by [`build`](Self::build) with their index.
    ///
    /// ```
    /// use reconnector::{ConfigError, ReconnectConfig};
    ///
    /// let err = ReconnectConfig::builder()
    ///     .connector(|| async { Ok::<_, std::io::Error>(()) })
    ///     .delays_ms([100, -1])
    ///     .build()
    ///     .unwrap_err();
    /// assert_eq!(err, ConfigError::InvalidDelay { index: 1, value: -1 });
    /// ```
    pub fn delays_ms<I>(mut self, delays: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        self.schedule = DelaySchedule::from_millis(delays);
        self
    }

    /// Sets a prebuilt backoff schedule.
    pub fn schedule(mut self, schedule: DelaySchedule) -> Self {
        self.schedule = Ok(schedule);
        self
    }

    /// Sets the owning status observer.
    ///
    /// It is called once per transition, in order, off the controller's call
    /// stack, and receives the event by value; this is how the connection
    /// reaches the caller.
    ///
    /// ```
    /// use reconnector::{ReconnectConfig, Status};
    ///
    /// let config = ReconnectConfig::builder()
    ///     .connector(|| async { Ok::<_, std::io::Error>(42u32) })
    ///     .on_status(|status, event| {
    ///         if status == Status::Connected {
    ///             let conn = event.into_connection();
    ///             println!("got {:?}", conn);
    ///         }
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_status<F>(mut self, f: F) -> Self
    where
        F: Fn(Status, EventFor<C>) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(f));
        self
    }

    /// Registers a listener for every event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&EventFor<C>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Registers a callback when a session begins.
    ///
    /// # Callback Signature
    /// `Fn(Instant)` - Called with the session start time.
    pub fn on_connecting<F>(mut self, f: F) -> Self
    where
        F: Fn(Instant) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let StatusEvent::Connecting { session_start, .. } = event {
                f(*session_start);
            }
        }));
        self
    }

    /// Registers a callback when a connection is established.
    ///
    /// # Callback Signature
    /// `Fn(&Connection, u64, u32)` - Called with a reference to the
    /// connection, the cumulative success count, and the number of attempts
    /// the session took.
    pub fn on_connected<F>(mut self, f: F) -> Self
    where
        F: Fn(&C::Connection, u64, u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let StatusEvent::Connected {
                connection,
                success_count,
                attempts,
                ..
            } = event
            {
                f(connection, *success_count, *attempts);
            }
        }));
        self
    }

    /// Registers a callback when an attempt fails.
    ///
    /// # Callback Signature
    /// `Fn(&ConnectionError, u32, bool)` - Called with the error, the 1-based
    /// attempt count, and whether this failure ends the session.
    ///
    /// # Example
    /// ```rust,no_run
    /// use reconnector::ReconnectConfig;
    ///
    /// let config = ReconnectConfig::builder()
    ///     .connector(|| async { Err::<(), _>(std::io::Error::other("refused")) })
    ///     .on_error(|error, count, terminal| {
    ///         println!("attempt {} failed (terminal: {}): {}", count, terminal, error);
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionError<C::Error>, u32, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let StatusEvent::Error {
                error,
                count,
                terminal,
                ..
            } = event
            {
                f(error, *count, *terminal);
            }
        }));
        self
    }

    /// Registers a callback when the attempt budget is exhausted.
    ///
    /// # Callback Signature
    /// `Fn(&ConnectionError, u32)` - Called with the final error and the
    /// number of attempts made.
    pub fn on_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionError<C::Error>, u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let StatusEvent::Failed {
                error, attempts, ..
            } = event
            {
                f(error, *attempts);
            }
        }));
        self
    }

    /// Registers a callback when connectivity is reported lost.
    pub fn on_disconnected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, StatusEvent::Disconnected { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback when the controller is stopped.
    ///
    /// # Callback Signature
    /// `Fn(Status)` - Called with the status `stop()` interrupted.
    pub fn on_stopped<F>(mut self, f: F) -> Self
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let StatusEvent::Stopped { previous, .. } = event {
                f(*previous);
            }
        }));
        self
    }

    /// Registers a callback when the controller settles to idle.
    ///
    /// # Callback Signature
    /// `Fn(Status)` - Called with `Failed` after an exhausted session, or with
    /// the status `stop()` interrupted.
    pub fn on_idle<F>(mut self, f: F) -> Self
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let StatusEvent::Idle { previous, .. } = event {
                f(*previous);
            }
        }));
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ReconnectConfig<C>, ConfigError> {
        let connector = self.connector.ok_or(ConfigError::MissingConnector)?;
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        let schedule = self.schedule?;

        Ok(ReconnectConfig {
            name: self.name,
            max_attempts: self.max_attempts,
            schedule,
            connector,
            on_status: self.on_status,
            event_listeners: self.event_listeners,
        })
    }
}
