// Tiltwatch - Handoff Queue
//
// Single-slot, latest-wins channel between the sampler (sole producer) and the
// evaluator (sole consumer). Sending never blocks: a reading the consumer has
// not picked up yet is overwritten. Receiving blocks until a value exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// The other end of the channel has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("handoff peer disconnected")]
pub struct Disconnected;

struct Slot<T> {
    value: Option<T>,
    sender_alive: bool,
    receiver_alive: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    overwritten: AtomicU64,
}

impl<T> Shared<T> {
    // The slot holds plain data; a panic on the other side cannot leave it
    // half-written, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected sender/receiver pair with an empty slot.
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            value: None,
            sender_alive: true,
            receiver_alive: true,
        }),
        ready: Condvar::new(),
        overwritten: AtomicU64::new(0),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

impl<T> Sender<T> {
    /// Place `value` in the slot, returning the stale value it replaced.
    ///
    /// Fails only when the receiver is gone.
    pub fn send(&self, value: T) -> Result<Option<T>, Disconnected> {
        let stale = {
            let mut slot = self.shared.lock();
            if !slot.receiver_alive {
                return Err(Disconnected);
            }
            slot.value.replace(value)
        };
        if stale.is_some() {
            self.shared.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.ready.notify_one();
        Ok(stale)
    }

    /// Number of values discarded because the consumer had not taken them yet.
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.shared.lock().sender_alive = false;
        self.shared.ready.notify_all();
    }
}

impl<T> Receiver<T> {
    /// Block until a value is available and take it.
    ///
    /// A value sent before the sender was dropped is still delivered; after
    /// that, `Disconnected` is returned.
    pub fn recv(&self) -> Result<T, Disconnected> {
        let mut slot = self.shared.lock();
        loop {
            if let Some(value) = slot.value.take() {
                return Ok(value);
            }
            if !slot.sender_alive {
                return Err(Disconnected);
            }
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Take the pending value without waiting.
    pub fn try_recv(&self) -> Option<T> {
        self.shared.lock().value.take()
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        slot.receiver_alive = false;
        slot.value = None;
    }
}
