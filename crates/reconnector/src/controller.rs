//! The reconnection controller and its driver task.
//!
//! A [`ReconnectController`] is a cheap handle. All state lives in a driver
//! task that owns the configuration, the current session, and the pending
//! attempt. `start()`, `stop()` and `disconnect()` enqueue commands for the
//! driver, so transitions are serialized without locks. Events are handed to
//! a [`Dispatcher`] and reach observers on a separate task, in order.

use crate::config::{EventFor, ReconnectConfig};
use crate::connector::Connector;
use crate::error::{ConfigError, ConnectionError};
use crate::schedule::DelaySchedule;
use crate::status::{Status, StatusEvent};
use reconnector_core::Dispatcher;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Disconnect,
}

/// Supervises a [`Connector`], retrying with backoff until it connects or the
/// attempt budget runs out.
///
/// Cloning the controller yields another handle to the same driver. When the
/// last handle is dropped the driver shuts down and any pending attempt is
/// abandoned silently.
///
/// # Examples
///
/// ```rust
/// use reconnector::{ReconnectConfig, ReconnectController, Status};
/// use std::time::Duration;
/// use tokio::sync::mpsc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, mut rx) = mpsc::unbounded_channel();
///
/// let config = ReconnectConfig::builder()
///     .connector(|| async { Ok::<_, std::io::Error>("connection") })
///     .name("example")
///     .max_attempts(3)
///     .delays([Duration::from_millis(10), Duration::from_millis(100)])
///     .on_status(move |status, event| {
///         let _ = tx.send((status, event.into_connection()));
///     })
///     .build()?;
///
/// let controller = ReconnectController::new(config)?;
/// controller.start();
///
/// assert_eq!(rx.recv().await.unwrap().0, Status::Connecting);
/// assert_eq!(rx.recv().await.unwrap(), (Status::Connected, Some("connection")));
/// # Ok(())
/// # }
/// ```
pub struct ReconnectController<C: Connector> {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<AtomicU8>,
    name: Arc<str>,
    _connector: std::marker::PhantomData<fn() -> C>,
}

impl<C: Connector> Clone for ReconnectController<C> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            status: Arc::clone(&self.status),
            name: Arc::clone(&self.name),
            _connector: std::marker::PhantomData,
        }
    }
}

impl<C: Connector> std::fmt::Debug for ReconnectController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectController")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

impl<C: Connector> ReconnectController<C> {
    /// Creates a controller in the `idle` state.
    ///
    /// Spawns the driver and notifier tasks on the current Tokio runtime;
    /// fails with [`ConfigError::NoRuntime`] when called outside one.
    pub fn new(config: ReconnectConfig<C>) -> Result<Self, ConfigError> {
        let handle = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "reconnect_attempts_total",
                    "Total number of connection attempts started"
                );
                describe_counter!(
                    "reconnect_transitions_total",
                    "Total number of status transitions"
                );
                describe_counter!(
                    "reconnect_sessions_total",
                    "Total number of sessions that ended connected or failed"
                );
                describe_gauge!("reconnect_state", "Current controller status code");
                describe_histogram!(
                    "reconnect_connect_duration_seconds",
                    "Time from session start to connected"
                );
            });
        }

        let ReconnectConfig {
            name,
            max_attempts,
            schedule,
            connector,
            on_status,
            event_listeners,
        } = config;

        let (notifier, _task) = Dispatcher::spawn(&handle, move |event: EventFor<C>| {
            event_listeners.emit(&event);
            if let Some(observer) = &on_status {
                observer(event.status(), event);
            }
        });

        let (commands, rx) = mpsc::unbounded_channel();
        let status = Arc::new(AtomicU8::new(Status::Idle.encode()));

        let driver = Driver {
            name: name.clone(),
            max_attempts,
            schedule,
            connector: Arc::new(connector),
            commands: rx,
            notifier,
            shared_status: Arc::clone(&status),
            status: Status::Idle,
            session: Session::new(),
            success_count: 0,
            epoch: 0,
        };
        handle.spawn(driver.run());

        #[cfg(feature = "tracing")]
        tracing::debug!(controller = %name, "reconnect controller created");

        Ok(Self {
            commands,
            status,
            name: name.into(),
            _connector: std::marker::PhantomData,
        })
    }

    /// Begins a connection session.
    ///
    /// No effect while already connecting or connected.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Abandons the current session and returns to `idle`.
    ///
    /// Cancels a pending backoff or in-flight attempt, resets the success
    /// count, and emits `stopped` followed by `idle`. Both events carry the
    /// status that was interrupted. Calling it while idle only re-emits
    /// those two events.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Reports an external loss of connectivity.
    ///
    /// While connected or connecting, emits `disconnected` and begins a new
    /// session with the backoff reset. No effect while idle.
    pub fn disconnect(&self) {
        self.send(Command::Disconnect);
    }

    /// Returns the last status committed by the driver.
    ///
    /// Commands are processed asynchronously, so this may lag behind a
    /// `start()` or `stop()` that was just issued.
    pub fn status(&self) -> Status {
        Status::decode(self.status.load(Ordering::Acquire))
    }

    /// Returns the controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(controller = %self.name, ?command, "driver is gone; command dropped");
        }
    }
}

/// Bookkeeping for one run of attempts.
#[derive(Debug, Clone, Copy)]
struct Session {
    start: Instant,
    /// Zero-based count of attempts already made.
    attempt_index: u32,
}

impl Session {
    fn new() -> Self {
        Self {
            start: now(),
            attempt_index: 0,
        }
    }
}

/// Result of one attempt, tagged with the epoch it was scheduled under.
struct Outcome<C: Connector> {
    epoch: u64,
    result: Result<C::Connection, C::Error>,
}

type PendingAttempt<C> = Pin<Box<dyn Future<Output = Outcome<C>> + Send>>;

enum Wake<C: Connector> {
    Command(Option<Command>),
    Outcome(Outcome<C>),
}

struct Driver<C: Connector> {
    name: String,
    max_attempts: u32,
    schedule: DelaySchedule,
    connector: Arc<C>,
    commands: mpsc::UnboundedReceiver<Command>,
    notifier: Dispatcher<EventFor<C>>,
    shared_status: Arc<AtomicU8>,
    status: Status,
    session: Session,
    success_count: u64,
    /// Bumped whenever the pending attempt is abandoned; outcomes carrying an
    /// older epoch are dropped.
    epoch: u64,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        let mut pending: Option<PendingAttempt<C>> = None;

        loop {
            // Commands win over a simultaneously ready outcome, so a stop()
            // issued before the outcome is observed always takes effect.
            let wake = tokio::select! {
                biased;
                command = self.commands.recv() => Wake::Command(command),
                outcome = next_outcome(&mut pending), if pending.is_some() => Wake::Outcome(outcome),
            };

            match wake {
                Wake::Command(Some(command)) => self.handle(command, &mut pending),
                Wake::Command(None) => break,
                Wake::Outcome(outcome) => {
                    pending = None;
                    self.complete(outcome, &mut pending);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(controller = %self.name, "all handles dropped; driver exiting");
    }

    fn handle(&mut self, command: Command, pending: &mut Option<PendingAttempt<C>>) {
        match (command, self.status) {
            (Command::Start, Status::Idle) => self.begin_session(pending),
            (Command::Start, _) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(controller = %self.name, status = %self.status, "start ignored");
            }
            (Command::Stop, previous) => {
                self.abandon(pending);
                self.success_count = 0;
                self.transition(StatusEvent::Stopped {
                    controller_name: self.name.clone(),
                    timestamp: now(),
                    previous,
                });
                self.transition(StatusEvent::Idle {
                    controller_name: self.name.clone(),
                    timestamp: now(),
                    previous,
                });
            }
            (Command::Disconnect, Status::Connected | Status::Connecting) => {
                self.abandon(pending);
                self.transition(StatusEvent::Disconnected {
                    controller_name: self.name.clone(),
                    timestamp: now(),
                });
                self.begin_session(pending);
            }
            (Command::Disconnect, _) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(controller = %self.name, status = %self.status, "disconnect ignored");
            }
        }
    }

    fn begin_session(&mut self, pending: &mut Option<PendingAttempt<C>>) {
        self.epoch = self.epoch.wrapping_add(1);
        self.session = Session::new();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            controller = %self.name,
            max_attempts = self.max_attempts,
            "session started"
        );

        self.transition(StatusEvent::Connecting {
            controller_name: self.name.clone(),
            timestamp: now(),
            session_start: self.session.start,
        });
        *pending = Some(self.schedule_attempt(Duration::ZERO));
    }

    fn complete(&mut self, outcome: Outcome<C>, pending: &mut Option<PendingAttempt<C>>) {
        if outcome.epoch != self.epoch || self.status != Status::Connecting {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                controller = %self.name,
                epoch = outcome.epoch,
                current = self.epoch,
                "dropping outcome of superseded attempt"
            );
            return;
        }

        let count = self.session.attempt_index + 1;

        match outcome.result {
            Ok(connection) => {
                self.success_count += 1;

                #[cfg(feature = "metrics")]
                {
                    counter!("reconnect_sessions_total", "controller" => self.name.clone(), "result" => "connected")
                        .increment(1);
                    histogram!("reconnect_connect_duration_seconds", "controller" => self.name.clone())
                        .record(now().saturating_duration_since(self.session.start).as_secs_f64());
                }

                self.transition(StatusEvent::Connected {
                    controller_name: self.name.clone(),
                    timestamp: now(),
                    connection,
                    success_count: self.success_count,
                    attempts: count,
                });
            }
            Err(error) => {
                let error = ConnectionError::new(count, error);
                let terminal = count >= self.max_attempts;

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    controller = %self.name,
                    attempt = count,
                    max_attempts = self.max_attempts,
                    terminal,
                    error = %error.inner(),
                    "connection attempt failed"
                );

                self.notify(StatusEvent::Error {
                    controller_name: self.name.clone(),
                    timestamp: now(),
                    error: error.clone(),
                    session_start: self.session.start,
                    count,
                    terminal,
                });

                if terminal {
                    #[cfg(feature = "metrics")]
                    counter!("reconnect_sessions_total", "controller" => self.name.clone(), "result" => "failed")
                        .increment(1);

                    self.transition(StatusEvent::Failed {
                        controller_name: self.name.clone(),
                        timestamp: now(),
                        error,
                        session_start: self.session.start,
                        attempts: count,
                    });
                    self.transition(StatusEvent::Idle {
                        controller_name: self.name.clone(),
                        timestamp: now(),
                        previous: Status::Failed,
                    });
                } else {
                    let delay = self
                        .schedule
                        .delay_for_attempt(self.session.attempt_index as usize);
                    self.session.attempt_index = count;
                    *pending = Some(self.schedule_attempt(delay));
                }
            }
        }
    }

    /// Builds the next attempt: wait out `delay`, then call the connector.
    fn schedule_attempt(&self, delay: Duration) -> PendingAttempt<C> {
        let epoch = self.epoch;
        let connector = Arc::clone(&self.connector);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            controller = %self.name,
            attempt = self.session.attempt_index + 1,
            delay_ms = delay.as_millis() as u64,
            "scheduling connection attempt"
        );

        #[cfg(feature = "metrics")]
        let name = self.name.clone();

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            // Counted only once the wait is over; a cancelled backoff is not an attempt.
            #[cfg(feature = "metrics")]
            counter!("reconnect_attempts_total", "controller" => name).increment(1);

            let result = connector.connect().await;
            Outcome { epoch, result }
        })
    }

    /// Drops the pending attempt, if any, and invalidates its epoch.
    fn abandon(&mut self, pending: &mut Option<PendingAttempt<C>>) {
        if pending.take().is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!(controller = %self.name, "pending attempt cancelled");
        }
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Commits the event's status and emits the event.
    fn transition(&mut self, event: EventFor<C>) {
        let from = self.status;
        let to = event.status();

        #[cfg(feature = "tracing")]
        tracing::info!(controller = %self.name, from = %from, to = %to, "status transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "reconnect_transitions_total",
                "controller" => self.name.clone(),
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
            gauge!("reconnect_state", "controller" => self.name.clone()).set(f64::from(to.encode()));
        }

        #[cfg(not(any(feature = "tracing", feature = "metrics")))]
        let _ = from;

        self.status = to;
        self.shared_status.store(to.encode(), Ordering::Release);
        self.notify(event);
    }

    /// Emits an event without changing the committed status.
    fn notify(&self, event: EventFor<C>) {
        if self.notifier.send(event).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(controller = %self.name, "notifier is gone; event dropped");
        }
    }
}

/// Wall-clock reading taken from Tokio's clock, so paused test time applies.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn next_outcome<C: Connector>(pending: &mut Option<PendingAttempt<C>>) -> Outcome<C> {
    match pending {
        Some(attempt) => attempt.as_mut().await,
        None => std::future::pending().await,
    }
}
