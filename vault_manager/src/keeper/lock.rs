//! Strategy Locking System
//!
//! A timeout-based lock that keeps a keeper from running two jobs on the same strategy,
//! while recovering automatically from a job that never released it.
//!
//! ```plain
//! Lock State Machine:
//!
//!                   ┌──────────┐
//!              ┌────► Unlocked │◄─────┐
//!              │    └──────────┘      │
//!              │         │            │
//! Auto-Unlock  │     try_lock       unlock
//! (Timeout)    │         │            │
//!              │         ▼            │
//!              │    ┌─────────┐       │
//!              └────┤ Locked  ├───────┘
//!                   └─────────┘
//!
//! Timeout = STRATEGY_LOCK_TIMEOUT (3600s)
//! ```

use crate::{
    constants::STRATEGY_LOCK_TIMEOUT,
    utils::error::{VaultError, VaultResult},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lock {
    /// Current lock state
    pub is_locked: bool,
    /// Last successful lock acquisition time, in seconds
    pub last_locked_at: Option<u64>,
}

impl Lock {
    fn expired(&self, now: u64) -> bool {
        self.last_locked_at
            .is_some_and(|last_locked_at| now.saturating_sub(last_locked_at) > STRATEGY_LOCK_TIMEOUT)
    }

    /// Acquires the lock if it is free or its holder timed out.
    ///
    /// # Returns
    /// * `Ok(())` - Lock successfully acquired
    /// * `Err(VaultError::Locked)` - Lock unavailable
    pub fn try_lock(&mut self, now: u64) -> VaultResult<()> {
        if self.is_locked && self.expired(now) {
            self.is_locked = false;
        }

        if !self.is_locked {
            self.is_locked = true;
            self.last_locked_at = Some(now);
            Ok(())
        } else {
            Err(VaultError::Locked)
        }
    }

    /// Releases the lock if it was acquired by the caller, or clears an abandoned one.
    pub fn unlock(&mut self, acquired_lock: bool, now: u64) -> &mut Self {
        if acquired_lock || (self.is_locked && self.expired(now)) {
            self.is_locked = false;
            self.last_locked_at = None;
        }
        self
    }
}
