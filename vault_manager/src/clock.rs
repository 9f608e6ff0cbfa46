//! Monotonic time source of the settlement layer.
//!
//! Operations never take a timestamp from the caller; the protocol handle reads its clock
//! once per transaction.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::Utc;

/// Source of the current time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall-clock time
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// Manually advanced clock for simulations and tests.
/// Cloning shares the underlying time.
#[derive(Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            seconds: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Moves time forward. Time never goes backwards.
    pub fn sleep(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
