//! Ordered asynchronous delivery to a single consumer.
//!
//! A [`Dispatcher`] decouples whoever produces a value from the code that
//! consumes it. Values are queued on an unbounded channel and drained by one
//! dedicated Tokio task, so the consumer:
//!
//! - never runs on the producer's call stack,
//! - sees values in exactly the order they were sent,
//! - is never invoked concurrently with itself.
//!
//! A panic inside the consumer is caught; the task keeps draining.
//!
//! # Examples
//!
//! ```rust
//! use reconnector_core::Dispatcher;
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let (dispatcher, task) = Dispatcher::spawn(
//!     &tokio::runtime::Handle::current(),
//!     move |value: u32| sink.lock().unwrap().push(value),
//! );
//!
//! dispatcher.send(1).unwrap();
//! dispatcher.send(2).unwrap();
//! drop(dispatcher);
//! task.await.unwrap();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! # }
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sending half of an ordered delivery queue.
///
/// Cloning a dispatcher yields another producer for the same queue. The
/// consumer task exits once every dispatcher has been dropped and the queue
/// is drained.
#[derive(Debug)]
pub struct Dispatcher<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Spawns the consumer task on `handle` and returns the producer side
    /// together with the task's join handle.
    pub fn spawn<F>(handle: &Handle, mut consumer: F) -> (Self, JoinHandle<()>)
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let task = handle.spawn(async move {
            while let Some(value) = rx.recv().await {
                if catch_unwind(AssertUnwindSafe(|| consumer(value))).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("dispatch consumer panicked; continuing with next value");
                }
            }
        });

        (Self { tx }, task)
    }

    /// Queues a value for delivery.
    ///
    /// Never blocks and never runs the consumer inline. Returns the value back
    /// if the consumer task is gone.
    pub fn send(&self, value: T) -> Result<(), T> {
        self.tx.send(value).map_err(|e| e.0)
    }

    /// Returns true if the consumer task has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
