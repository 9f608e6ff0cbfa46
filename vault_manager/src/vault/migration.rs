//! Hot swap of a strategy's allocation to a new implementation

use alloy_primitives::{Address, U256};

use super::Vault;
use crate::{
    access::GOVERNANCE,
    journal::{JournalCollection, LogType},
    settlement::Settlement,
    strategy::Strategy,
    utils::{
        common::require_non_zero,
        error::{invariant_err, VaultError, VaultResult},
    },
};

impl Vault {
    /// Moves the allocation, debt and every balance of `old` to `new`.
    ///
    /// `old` is left revoked with no debt and no assets and is permanently retired. A
    /// residual balance on `old` fails with `MigrationIncomplete`.
    pub(crate) fn migrate_strategy(
        &mut self,
        caller: Address,
        old: &mut Strategy,
        new: &Strategy,
        settlement: &mut Settlement,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;

        let new_address = require_non_zero(new.address())?;
        let old_address = old.address();
        let record = self
            .strategies
            .get(&old_address)
            .ok_or(VaultError::NonExistentValue)?
            .clone();

        if record.migrated {
            return Err(invariant_err("The strategy was already migrated."));
        }
        if self.strategies.contains_key(&new_address) {
            return Err(invariant_err("The new strategy is already active."));
        }
        if new.status().is_migrated() {
            return Err(invariant_err("The new strategy was already migrated."));
        }
        if new.binding().vault != self.address() {
            return Err(invariant_err("The new strategy is bound to another vault."));
        }
        if new.binding().want != self.want() {
            return Err(invariant_err("The new strategy manages a different want."));
        }

        self.strategies.insert(new_address, record.inherit());
        if let Some(retired) = self.strategies.get_mut(&old_address) {
            retired.total_debt = U256::ZERO;
            retired.migrated = true;
        }
        self.revoke(old_address)?;
        // The new record inherits the old ratio
        self.debt_ratio += record.debt_ratio;

        old.migrate(self.address(), new, settlement, journal)?;

        if let Some(slot) = self
            .withdrawal_queue
            .iter_mut()
            .find(|queued| **queued == old_address)
        {
            *slot = new_address;
        }

        let residual_assets = old.estimated_total_assets(settlement);
        if residual_assets > U256::ZERO {
            return Err(VaultError::MigrationIncomplete(format!(
                "Strategy {} still holds {} in assets.",
                old_address, residual_assets
            )));
        }

        journal.append_note(
            Ok(()),
            LogType::Migration,
            format!(
                "Migrated {} of debt from {} to {}.",
                record.total_debt, old_address, new_address
            ),
        );
        Ok(())
    }
}
