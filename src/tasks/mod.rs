// Tiltwatch - Periodic Tasks

pub mod evaluator;
pub mod sampler;

use std::thread;
use std::time::{Duration, Instant};

/// Sleep for what is left of `interval` since `tick_start`.
pub(crate) fn sleep_remainder(tick_start: Instant, interval: Duration) -> Duration {
    let elapsed = tick_start.elapsed();
    if elapsed < interval {
        thread::sleep(interval - elapsed);
    }
    elapsed
}
