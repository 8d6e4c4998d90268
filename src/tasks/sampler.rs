// Tiltwatch - Sampler Task
//
// Reads the accelerometer once per tick and hands the reading to the
// evaluator. Never waits on the consumer: an unconsumed reading is simply
// overwritten. Stops once the alarm latches.

use std::time::{Duration, Instant};

use crate::drivers::AccelSource;
use crate::escalation::AlarmLatch;
use crate::events::Reading;
use crate::handoff::Sender;

/// Runs until the alarm latches or the evaluator hangs up, then hands the
/// sensor back.
pub fn sampler_task<A: AccelSource>(
    mut accel: A,
    tx: Sender<Reading>,
    latch: AlarmLatch,
    interval: Duration,
) -> A {
    log::info!("Sampler task started ({:?} period)", interval);

    loop {
        if latch.is_set() {
            log::info!(
                "Alarm latched, sampler stopped ({} stale readings overwritten)",
                tx.overwritten()
            );
            break;
        }

        let tick_start = Instant::now();

        match accel.read_accel() {
            Ok(reading) => match tx.send(reading) {
                Ok(Some(stale)) => log::trace!("Overwrote unconsumed reading {:?}", stale),
                Ok(None) => {}
                Err(_) => {
                    // Receiver dropped: evaluator has exited.
                    log::warn!("Handoff channel closed, exiting sampler task");
                    break;
                }
            },
            Err(e) => {
                log::warn!("Accelerometer read error: {}", e);
            }
        }

        super::sleep_remainder(tick_start, interval);
    }

    accel
}
