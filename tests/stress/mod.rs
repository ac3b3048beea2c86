//! Stress tests for the reconnect controller
//!
//! These tests push the controller to its limits to validate behavior under extreme conditions.
//! They are marked with `#[ignore]` and must be run explicitly:
//!
//! ```bash
//! # Run all stress tests
//! cargo test --test stress -- --ignored
//!
//! # Run with output
//! cargo test --test stress -- --ignored --nocapture
//! ```
//!
//! ## What We Test
//!
//! - **High volume**: Thousands of sessions on one controller
//! - **High concurrency**: Thousands of controllers at once
//! - **State consistency**: At most one attempt in flight under command storms
//! - **Resource cleanup**: Drivers exit and release their connectors


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Utility: Track peak concurrent operations
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn enter(self: &Arc<Self>) -> TrackerGuard {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        TrackerGuard(Arc::clone(self))
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

/// Leaves the tracker when dropped, including when the owning future is cancelled.
pub struct TrackerGuard(Arc<ConcurrencyTracker>);

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resident set size of this process in megabytes, if the platform exposes it.
#[cfg(target_os = "linux")]
pub fn get_memory_usage_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let rss_kb = status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))?
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse::<f64>()
        .ok()?;
    Some(rss_kb / 1024.0)
}

/// Resident set size of this process in megabytes, if the platform exposes it.
#[cfg(target_os = "macos")]
pub fn get_memory_usage_mb() -> Option<f64> {
    let output = std::process::Command::new("ps")
        .args(["-o", "rss=", "-p", &std::process::id().to_string()])
        .output()
        .ok()?;
    let rss_kb = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<f64>()
        .ok()?;
    Some(rss_kb / 1024.0)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn get_memory_usage_mb() -> Option<f64> {
    None
}

#[cfg(target_os = "linux")]
#[test]
fn memory_usage_reads_resident_set() {
    let rss = get_memory_usage_mb().expect("VmRSS present in /proc/self/status");
    assert!(rss > 0.0);
}
