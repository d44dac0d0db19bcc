//! Periodic update loop.
//!
//! The ticker thread drives [`Statistics::update`] so active time is credited,
//! the day rolls over at midnight and the current day is checkpointed even
//! when no input arrives.

use crate::statistics::Statistics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the ticker thread.
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// How often to call `update` (default: 1s).
    pub interval: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Spawns the update thread.
///
/// The thread calls `update` once per interval until `shutdown` is set, then
/// writes a final checkpoint of the current day.
///
/// # Example
/// ```ignore
/// let shutdown = Arc::new(AtomicBool::new(false));
/// let handle = spawn_ticker(Arc::clone(&stats), Arc::clone(&shutdown), TickerConfig::default());
///
/// // ... run until asked to stop ...
///
/// shutdown.store(true, Ordering::SeqCst);
/// handle.join().unwrap();
/// ```
pub fn spawn_ticker(
    stats: Arc<Statistics>,
    shutdown: Arc<AtomicBool>,
    config: TickerConfig,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::info!(
            interval_ms = config.interval.as_millis(),
            "Statistics ticker started"
        );

        while !shutdown.load(Ordering::SeqCst) {
            stats.update();
            sleep_unless_shutdown(&shutdown, config.interval);
        }

        tracing::info!("Statistics ticker shutting down");

        // Final checkpoint before exit
        stats.update();
        stats.dump();
    })
}

/// Sleeps for `total` in short slices so shutdown is noticed promptly.
fn sleep_unless_shutdown(shutdown: &AtomicBool, total: Duration) {
    const SLICE: Duration = Duration::from_millis(100);

    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::SeqCst) {
        let step = remaining.min(SLICE);
        thread::sleep(step);
        remaining -= step;
    }
}
