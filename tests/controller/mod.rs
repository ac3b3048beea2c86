//! Comprehensive tests for the reconnection controller.
//!
//! Test organization:
//! - lifecycle.rs: start/stop/disconnect transitions and idempotence
//! - failure.rs: attempt budget, error/failed sequencing, restart after failure
//! - backoff.rs: delay schedule timing and per-session reset
//! - cancellation.rs: stop/disconnect while a delay or attempt is pending
//! - notifications.rs: ordering, off-stack delivery, listener isolation
//! - service_connector.rs: Tower services as connectors

mod lifecycle;
mod service_connector;

use reconnector::{ReconnectConfig, ReconnectConfigBuilder, ReconnectController};
use reconnector_tests::{EventLog, FlakyConnector};
use std::time::Duration;

/// Builder wired to `connector` and recording into `log`, with short delays.
pub(crate) fn builder(
    connector: &FlakyConnector,
    log: &EventLog,
) -> ReconnectConfigBuilder<FlakyConnector> {
    ReconnectConfig::builder()
        .connector(connector.clone())
        .name("test")
        .delays([Duration::from_millis(10), Duration::from_millis(20)])
        .on_status(log.observer())
}

pub(crate) fn controller(
    connector: &FlakyConnector,
    log: &EventLog,
) -> ReconnectController<FlakyConnector> {
    ReconnectController::new(builder(connector, log).build().unwrap()).unwrap()
}
