// Tiltwatch - Escalation Timer
//
// One-shot countdown timer used to measure how long a tilt episode has been
// open. Every backend follows the same rules:
//   - `enable()` arms the timer only from the cleared state; while counting,
//     or after firing, it does nothing.
//   - At the deadline the callback raises the `DeadlineFlag` exactly once and
//     the timer stops.
//   - `clear()` cancels a pending deadline and returns to the cleared state.
//     It cannot retract a flag that was already raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Control surface of the escalation timer, driven by the evaluator.
pub trait EscalationTimer: Send {
    /// Stop counting and reset; leaves the timer disarmed.
    fn clear(&mut self);

    /// Start counting toward the deadline if the timer is cleared.
    fn enable(&mut self);
}

// ---------------------------------------------------------------------------
// Deadline notification flag (the only state touched from timer context)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct DeadlineFlag(Arc<AtomicBool>);

impl DeadlineFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from the timer callback. Must stay lock-free.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Read-and-clear; true at most once per `raise`.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Host backend: a dedicated thread waiting on a condition variable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Countdown {
    Cleared,
    Armed(Instant),
    Fired,
    Shutdown,
}

type SharedCountdown = Arc<(Mutex<Countdown>, Condvar)>;

fn lock(shared: &SharedCountdown) -> MutexGuard<'_, Countdown> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ThreadTimer {
    deadline: Duration,
    shared: SharedCountdown,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new(deadline: Duration, flag: DeadlineFlag) -> std::io::Result<Self> {
        let shared: SharedCountdown = Arc::new((Mutex::new(Countdown::Cleared), Condvar::new()));
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("escalation-timer".into())
            .spawn(move || countdown_worker(worker_shared, flag))?;

        Ok(Self {
            deadline,
            shared,
            worker: Some(worker),
        })
    }

    fn set(&self, next: Countdown) {
        *lock(&self.shared) = next;
        self.shared.1.notify_all();
    }
}

fn countdown_worker(shared: SharedCountdown, flag: DeadlineFlag) {
    let mut state = lock(&shared);
    loop {
        let current = *state;
        match current {
            Countdown::Shutdown => return,
            Countdown::Armed(at) => {
                let now = Instant::now();
                if now >= at {
                    *state = Countdown::Fired;
                    flag.raise();
                    log::debug!("Escalation deadline reached");
                    continue;
                }
                state = shared
                    .1
                    .wait_timeout(state, at - now)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
            Countdown::Cleared | Countdown::Fired => {
                state = shared.1.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        }
    }
}

impl EscalationTimer for ThreadTimer {
    fn clear(&mut self) {
        self.set(Countdown::Cleared);
    }

    fn enable(&mut self) {
        let mut state = lock(&self.shared);
        if *state == Countdown::Cleared {
            *state = Countdown::Armed(Instant::now() + self.deadline);
            drop(state);
            self.shared.1.notify_all();
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.set(Countdown::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Simulated-time backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ManualState {
    remaining: Option<Duration>,
    fired: bool,
    arm_count: u32,
    fire_count: u32,
}

/// Timer driven by explicit `advance` calls instead of a clock.
///
/// Clones share the same countdown, so a test can keep one handle while the
/// evaluator owns another.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    deadline: Duration,
    flag: DeadlineFlag,
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new(deadline: Duration, flag: DeadlineFlag) -> Self {
        Self {
            deadline,
            flag,
            state: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Let `elapsed` of simulated time pass, firing if the deadline is hit.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state();
        if let Some(remaining) = state.remaining {
            if elapsed >= remaining {
                state.remaining = None;
                state.fired = true;
                state.fire_count += 1;
                self.flag.raise();
            } else {
                state.remaining = Some(remaining - elapsed);
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state().remaining.is_some()
    }

    /// Time left before the deadline, if counting.
    pub fn remaining(&self) -> Option<Duration> {
        self.state().remaining
    }

    /// How many times the countdown was started from the cleared state.
    pub fn arm_count(&self) -> u32 {
        self.state().arm_count
    }

    pub fn fire_count(&self) -> u32 {
        self.state().fire_count
    }
}

impl EscalationTimer for ManualTimer {
    fn clear(&mut self) {
        let mut state = self.state();
        state.remaining = None;
        state.fired = false;
    }

    fn enable(&mut self) {
        let mut state = self.state();
        if state.remaining.is_none() && !state.fired {
            state.remaining = Some(self.deadline);
            state.arm_count += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Firmware backend: esp_timer one-shot
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
pub use esp::EspEscalationTimer;

#[cfg(target_os = "espidf")]
mod esp {
    use std::time::Duration;

    use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
    use esp_idf_sys::EspError;

    use super::{DeadlineFlag, EscalationTimer};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Armed {
        No,
        Counting,
    }

    /// One-shot `esp_timer`. The callback runs in the esp_timer task and only
    /// raises the deadline flag.
    pub struct EspEscalationTimer {
        timer: EspTimer<'static>,
        deadline: Duration,
        armed: Armed,
    }

    impl EspEscalationTimer {
        pub fn new(deadline: Duration, flag: DeadlineFlag) -> Result<Self, EspError> {
            let service = EspTaskTimerService::new()?;
            let timer = service.timer(move || flag.raise())?;
            Ok(Self {
                timer,
                deadline,
                armed: Armed::No,
            })
        }
    }

    impl EscalationTimer for EspEscalationTimer {
        fn clear(&mut self) {
            if let Err(e) = self.timer.cancel() {
                log::error!("Escalation timer cancel failed: {}", e);
            }
            self.armed = Armed::No;
        }

        // A fired one-shot stays `Counting` until cleared, matching the
        // stop-on-compare behaviour of the other backends.
        fn enable(&mut self) {
            if self.armed == Armed::Counting {
                return;
            }
            match self.timer.after(self.deadline) {
                Ok(()) => self.armed = Armed::Counting,
                Err(e) => log::error!("Escalation timer start failed: {}", e),
            }
        }
    }
}
