//! Halting service for states that need manual reconciliation

use alloy_primitives::Address;
use candid::CandidType;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    utils::error::{VaultError, VaultResult},
    vault::Vault,
};

/// Halt struct containing reasoning and status
#[derive(Clone, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Halt {
    /// The current halt status
    pub status: HaltStatus,
    /// The halt message (if the protocol status is not `Functional`)
    pub message: Option<String>,
}

impl Default for Halt {
    fn default() -> Self {
        Self {
            status: HaltStatus::Functional,
            message: None,
        }
    }
}

/// Halt Status enum determining the stage the protocol is at
#[derive(Clone, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum HaltStatus {
    /// Functioning as expected
    Functional,
    /// Fully halted
    Halted {
        /// Timestamp of the halt, in seconds
        halted_at: u64,
    },
}

impl Halt {
    /// Returns `true` if the protocol is not halted
    pub fn is_functional(&self) -> bool {
        self.status == HaltStatus::Functional
    }

    pub fn require_functional(&self) -> VaultResult<()> {
        if self.is_functional() {
            return Ok(());
        }
        Err(VaultError::Halted(
            self.message
                .clone()
                .unwrap_or_else(|| "The protocol is halted.".to_string()),
        ))
    }

    pub fn halt<S: Into<String>>(&mut self, now: u64, message: S) {
        *self = Halt {
            status: HaltStatus::Halted { halted_at: now },
            message: Some(message.into()),
        };
    }

    pub fn resume(&mut self) {
        *self = Halt::default();
    }
}

/// Strategies of `vault` that have not reported in the past `days`
pub fn stale_strategies(vault: &Vault, now: u64, days: u64) -> Vec<Address> {
    vault
        .strategies()
        .filter(|(_, record)| record.debt_ratio > 0 || !record.total_debt.is_zero())
        .filter(|(_, record)| is_older_than(record.last_report, now, days))
        .map(|(address, _)| *address)
        .collect()
}

/// Check if a given timestamp (seconds) is older than the given number of days
fn is_older_than(timestamp: u64, now: u64, days: u64) -> bool {
    if timestamp == 0 {
        return false;
    }

    let threshold = now.saturating_sub(Duration::days(days as i64).num_seconds() as u64);

    timestamp < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{tests::vault, StrategyRecord};
    use alloy_primitives::U256;

    #[test]
    fn halted_protocol_refuses_work_until_resumed() {
        let mut halt = Halt::default();
        assert!(halt.require_functional().is_ok());

        halt.halt(100, "Residual balance after migration.");
        assert_eq!(halt.status, HaltStatus::Halted { halted_at: 100 });
        assert_eq!(
            halt.require_functional(),
            Err(VaultError::Halted("Residual balance after migration.".to_string()))
        );

        halt.resume();
        assert!(halt.is_functional());
        assert_eq!(halt.message, None);
    }

    #[test]
    fn stale_strategies_skip_drained_records() {
        let day = 86_400;
        let mut vault = vault(0);
        let fresh = Address::repeat_byte(0x51);
        let stale = Address::repeat_byte(0x52);
        let drained = Address::repeat_byte(0x53);
        vault.strategies.insert(
            fresh,
            StrategyRecord {
                debt_ratio: 1,
                last_report: 9 * day,
                ..Default::default()
            },
        );
        vault.strategies.insert(
            stale,
            StrategyRecord {
                total_debt: U256::from(1),
                last_report: day,
                ..Default::default()
            },
        );
        vault.strategies.insert(
            drained,
            StrategyRecord {
                last_report: day,
                ..Default::default()
            },
        );

        assert_eq!(stale_strategies(&vault, 10 * day, 7), vec![stale]);
    }
}
