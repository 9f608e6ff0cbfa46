//! Keeper automation: polls triggers and harvests or tends the strategies that need it.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

pub(crate) mod lock;
pub(crate) mod run;

pub use lock::Lock;

use crate::strategy::TriggerReason;
use crate::utils::error::VaultError;

/// What a keeper cycle did with one strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeeperOutcome {
    Harvested(TriggerReason),
    Tended,
    Skipped,
    /// Another job holds the strategy
    Locked,
    Failed(VaultError),
}

/// An off-protocol keeper acting under `identity`
#[derive(Clone, Debug)]
pub struct Keeper {
    identity: Address,
    /// Estimated cost of one call, in want
    call_cost: U256,
    locks: BTreeMap<Address, Lock>,
}

impl Keeper {
    pub fn new(identity: Address, call_cost: U256) -> Self {
        Self {
            identity,
            call_cost,
            locks: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn call_cost(&self) -> U256 {
        self.call_cost
    }

    pub fn set_call_cost(&mut self, call_cost: U256) -> &mut Self {
        self.call_cost = call_cost;
        self
    }

    pub fn lock(&self, strategy: Address) -> Option<&Lock> {
        self.locks.get(&strategy)
    }

    /// Lock of `strategy`, created unlocked on first use
    pub fn lock_mut(&mut self, strategy: Address) -> &mut Lock {
        self.locks.entry(strategy).or_default()
    }
}
