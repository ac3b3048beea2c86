//! Common test utilities for the reconnector integration tests and benches.

use reconnector::{Connector, Status, StatusEvent};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Opaque connection handed out by [`FlakyConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConnection {
    /// Zero-based index of the connector call that produced it.
    pub id: usize,
}

/// Error returned by [`FlakyConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refused {
    /// Zero-based index of the connector call that failed.
    pub call: usize,
}

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection refused (call {})", self.call)
    }
}

impl std::error::Error for Refused {}

/// Connector that refuses every call below a moving threshold.
///
/// Calls are numbered from zero. A call succeeds once its number reaches the
/// threshold; [`fail_next`](Self::fail_next) moves the threshold so the next
/// `n` calls fail again.
#[derive(Clone)]
pub struct FlakyConnector {
    calls: Arc<AtomicUsize>,
    fail_until: Arc<AtomicUsize>,
    latency: Duration,
}

impl FlakyConnector {
    /// Fails the first `failures` calls, then succeeds.
    pub fn new(failures: usize) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_until: Arc::new(AtomicUsize::new(failures)),
            latency: Duration::ZERO,
        }
    }

    /// Never succeeds.
    pub fn always_failing() -> Self {
        Self::new(usize::MAX)
    }

    /// Makes every call take `latency` before resolving.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the next `n` calls fail.
    pub fn fail_next(&self, n: usize) {
        let calls = self.calls.load(Ordering::SeqCst);
        self.fail_until.store(calls.saturating_add(n), Ordering::SeqCst);
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Connector for FlakyConnector {
    type Connection = TestConnection;
    type Error = Refused;
    type Future = Pin<Box<dyn Future<Output = Result<TestConnection, Refused>> + Send>>;

    fn connect(&self) -> Self::Future {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let fails = call < self.fail_until.load(Ordering::SeqCst);
        let latency = self.latency;

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if fails {
                Err(Refused { call })
            } else {
                Ok(TestConnection { id: call })
            }
        })
    }
}

/// One observed notification, flattened for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub status: Status,
    /// `count` of an `error` event.
    pub count: Option<u32>,
    /// `terminal` flag of an `error` event.
    pub terminal: Option<bool>,
    /// `attempts` of a `connected` or `failed` event.
    pub attempts: Option<u32>,
    /// `success_count` of a `connected` event.
    pub success_count: Option<u64>,
    /// `previous` of a `stopped` or `idle` event.
    pub previous: Option<Status>,
    /// Id of the connection handed over by a `connected` event.
    pub connection: Option<usize>,
    /// `session_start` of a `connecting`, `error` or `failed` event.
    pub session_start: Option<std::time::Instant>,
    /// Paused-clock time at which the observer ran.
    pub at: tokio::time::Instant,
}

/// Records every event delivered to a status observer.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Recorded>>>,
    changed: Arc<Notify>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an observer suitable for `ReconnectConfigBuilder::on_status`.
    pub fn observer(
        &self,
    ) -> impl Fn(Status, StatusEvent<TestConnection, Refused>) + Send + Sync + 'static {
        let log = self.clone();
        move |status, event| log.record(status, event)
    }

    fn record(&self, status: Status, event: StatusEvent<TestConnection, Refused>) {
        let mut entry = Recorded {
            status,
            count: None,
            terminal: None,
            attempts: None,
            success_count: None,
            previous: None,
            connection: None,
            session_start: None,
            at: tokio::time::Instant::now(),
        };
        match event {
            StatusEvent::Error {
                count,
                terminal,
                session_start,
                ..
            } => {
                entry.count = Some(count);
                entry.terminal = Some(terminal);
                entry.session_start = Some(session_start);
            }
            StatusEvent::Connected {
                connection,
                success_count,
                attempts,
                ..
            } => {
                entry.attempts = Some(attempts);
                entry.success_count = Some(success_count);
                entry.connection = Some(connection.id);
            }
            StatusEvent::Failed {
                attempts,
                session_start,
                ..
            } => {
                entry.attempts = Some(attempts);
                entry.session_start = Some(session_start);
            }
            StatusEvent::Stopped { previous, .. } | StatusEvent::Idle { previous, .. } => {
                entry.previous = Some(previous);
            }
            StatusEvent::Connecting { session_start, .. } => {
                entry.session_start = Some(session_start);
            }
            StatusEvent::Disconnected { .. } => {}
        }
        self.events.lock().unwrap().push(entry);
        self.changed.notify_waiters();
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    /// Snapshot of the recorded statuses.
    pub fn statuses(&self) -> Vec<Status> {
        self.events.lock().unwrap().iter().map(|e| e.status).collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Waits until at least `n` events have been recorded.
    pub async fn wait_for_len(&self, n: usize) {
        loop {
            let changed = self.changed.notified();
            if self.len() >= n {
                return;
            }
            changed.await;
        }
    }

    /// Waits until an event with `status` has been recorded.
    pub async fn wait_for(&self, status: Status) {
        loop {
            let changed = self.changed.notified();
            if self.statuses().contains(&status) {
                return;
            }
            changed.await;
        }
    }
}

/// Yields repeatedly so spawned driver and notifier tasks can catch up.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
