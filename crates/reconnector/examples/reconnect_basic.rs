//! Basic reconnection example with a staged backoff schedule.
//!
//! Run with: cargo run --example reconnect_basic -p reconnector --features tracing
//!
//! The connector below refuses the first two attempts, so the controller
//! reports two errors, waits out the schedule, and then connects. A
//! simulated connection loss afterwards starts a fresh session.

use reconnector::{ReconnectConfig, ReconnectController, Status};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    println!("Reconnect Controller - Basic Example\n");

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let config = ReconnectConfig::builder()
        .connector(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 3 < 2 {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "server not ready",
                    ))
                } else {
                    Ok(format!("connection #{}", n))
                }
            }
        })
        .name("example")
        .max_attempts(5)
        .delays([
            Duration::from_millis(50),  // after the 1st failure
            Duration::from_millis(200), // after the 2nd and later failures
        ])
        .on_error(|error, count, terminal| {
            println!("  attempt {} failed (terminal: {}): {}", count, terminal, error);
        })
        .on_status(move |status, event| {
            let _ = tx.send((status, event.into_connection()));
        })
        .build()?;

    println!("Configuration:");
    println!("  Delays: 50ms, 200ms");
    println!("  Max attempts: 5\n");

    let controller = ReconnectController::new(config)?;
    controller.start();

    let mut sessions = 0;
    while let Some((status, connection)) = rx.recv().await {
        println!("status: {}", status);
        if let Some(connection) = connection {
            println!("  received {}", connection);
            sessions += 1;
            if sessions == 1 {
                println!("\nSimulating connection loss...");
                controller.disconnect();
            } else {
                controller.stop();
            }
        }
        if status == Status::Idle {
            break;
        }
    }

    Ok(())
}
