//! Strategy lifecycle.
//!
//! ```plain
//!                add_strategy            set_emergency_exit       debt repaid
//!  ┌──────────┐              ┌────────┐               ┌─────────┐          ┌──────┐
//!  │ Inactive ├─────────────►│ Active ├──────────────►│ Exiting ├─────────►│ Idle │
//!  └──────────┘              └───┬────┘               └────┬────┘          └──┬───┘
//!                                │ migrate                 │ migrate          │ migrate
//!                                ▼                         ▼                  ▼
//!                           ┌──────────────────────────────────────────────────────┐
//!                           │                 Migrated (terminal)                  │
//!                           └──────────────────────────────────────────────────────┘
//! ```
//!
//! Only the one-way flags live on the strategy (`StrategyStatus`). The full lifecycle is
//! derived against the vault's record.

use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::{
    utils::error::{VaultError, VaultResult},
    vault::StrategyRecord,
};

/// One-way flags of a strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyStatus {
    #[default]
    Operating,
    Exiting,
    Migrated,
}

impl StrategyStatus {
    /// Status after an emergency exit
    pub fn exit(self) -> VaultResult<Self> {
        match self {
            StrategyStatus::Operating => Ok(StrategyStatus::Exiting),
            StrategyStatus::Exiting => Err(VaultError::InvalidTransition(
                "Emergency exit is already set.".to_string(),
            )),
            StrategyStatus::Migrated => Err(VaultError::InvalidTransition(
                "A migrated strategy cannot exit.".to_string(),
            )),
        }
    }

    /// Status after a migration
    pub fn retire(self) -> VaultResult<Self> {
        match self {
            StrategyStatus::Operating | StrategyStatus::Exiting => Ok(StrategyStatus::Migrated),
            StrategyStatus::Migrated => Err(VaultError::InvalidTransition(
                "The strategy was already migrated.".to_string(),
            )),
        }
    }

    /// Fails once the strategy is migrated
    pub fn require_operational(self) -> VaultResult<()> {
        if self.is_migrated() {
            return Err(VaultError::InvalidTransition(
                "The strategy was migrated.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_exiting(self) -> bool {
        self == StrategyStatus::Exiting
    }

    pub fn is_migrated(self) -> bool {
        self == StrategyStatus::Migrated
    }
}

/// Lifecycle stage of a strategy as seen by its vault
#[derive(Clone, Copy, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Lifecycle {
    /// Bound but never added to the vault
    Inactive,
    Active,
    /// In emergency exit with debt still to repay
    Exiting,
    /// Holds no allocation and no debt
    Idle,
    Migrated,
}

impl Lifecycle {
    pub fn derive(status: StrategyStatus, record: Option<&StrategyRecord>) -> Self {
        if status.is_migrated() {
            return Lifecycle::Migrated;
        }
        let Some(record) = record else {
            return Lifecycle::Inactive;
        };
        let idle = record.total_debt.is_zero();
        match status {
            StrategyStatus::Exiting if idle => Lifecycle::Idle,
            StrategyStatus::Exiting => Lifecycle::Exiting,
            _ if idle && record.debt_ratio == 0 => Lifecycle::Idle,
            _ => Lifecycle::Active,
        }
    }
}
