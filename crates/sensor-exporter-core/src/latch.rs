//! Shock event latch.
//!
//! The latch is set when the shock input goes high and cleared only when a
//! response reports it. It is backed by an `AtomicBool` so it can be shared
//! with an interrupt handler: `take` swaps the flag out in one operation and a
//! `set` racing with it is either reported now or by the next response.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot shock event flag.
#[derive(Debug, Default)]
pub struct ShockLatch {
    flag: AtomicBool,
}

impl ShockLatch {
    /// Create a cleared latch.
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Record a shock event.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether an event is waiting to be reported.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Consume the pending event, clearing the latch.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}
