//! Supervised reconnection for asynchronous connectors.
//!
//! This crate wraps an unreliable connect operation in a controller that keeps
//! trying until it succeeds, waiting between attempts according to a staged
//! backoff schedule, and announcing every status transition to observers.
//!
//! # Features
//!
//! - **Staged backoff**: an explicit schedule of waits, saturating at the last entry
//! - **Attempt budget**: give up with `failed` after `max_attempts` per session
//! - **Ordered notifications**: delivered off the caller's stack, never reordered
//! - **Cancellation**: `stop()` abandons pending waits and in-flight attempts
//! - **Tower integration**: any `Service<Target>` can act as the connector
//!
//! # State machine
//!
//! ```text
//! idle --start()--> connecting --ok--> connected --disconnect()--> disconnected --> connecting
//!                    |    ^  \
//!           err, budget   |   err, budget exhausted --> failed --> idle
//!              remains ---+
//! any --stop()--> stopped --> idle
//! ```
//!
//! # Examples
//!
//! ```rust
//! use reconnector::{ReconnectConfig, ReconnectController};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), reconnector::ConfigError> {
//! let config = ReconnectConfig::builder()
//!     .connector(|| async { Ok::<_, std::io::Error>(()) })
//!     .name("upstream")
//!     .max_attempts(5)
//!     .delays([Duration::from_millis(100), Duration::from_secs(1)])
//!     .on_error(|error, count, terminal| {
//!         eprintln!("attempt {count} failed (terminal: {terminal}): {error}");
//!     })
//!     .on_connected(|_conn, successes, attempts| {
//!         println!("connected after {attempts} attempts ({successes} total)");
//!     })
//!     .build()?;
//!
//! let controller = ReconnectController::new(config)?;
//! controller.start();
//! # Ok(())
//! # }
//! ```

mod config;
mod connector;
mod controller;
mod error;
mod schedule;
mod status;

pub use config::{
    EventFor, ReconnectConfig, ReconnectConfigBuilder, StatusObserver, DEFAULT_MAX_ATTEMPTS,
};
pub use connector::{Connector, ServiceConnector};
pub use controller::ReconnectController;
pub use error::{ConfigError, ConnectionError};
pub use schedule::DelaySchedule;
pub use status::{Status, StatusEvent};

// Re-export the event plumbing for custom listeners
pub use reconnector_core::events::{ControllerEvent, EventListener, EventListeners, FnListener};
