//! Core infrastructure for reconnector.
//!
//! This crate provides the pieces the reconnection controller builds its
//! notification protocol from:
//! - Event system (`ControllerEvent`, listeners, panic-isolated fan-out)
//! - Ordered asynchronous delivery (`Dispatcher`)

pub mod dispatch;
pub mod events;

pub use dispatch::Dispatcher;
pub use events::{ControllerEvent, EventListener, EventListeners, FnListener};
