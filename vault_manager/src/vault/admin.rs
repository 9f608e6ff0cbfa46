//! Governance of the vault: strategy registration, allocation and vault-level setters

use alloy_primitives::{Address, U256};

use super::{StrategyParams, StrategyRecord, Vault};
use crate::{
    access::{Role, GOVERNANCE, VAULT_MANAGERS},
    constants::{degradation_coefficient, MAXIMUM_STRATEGIES, MAX_BPS, MAX_PERFORMANCE_FEE},
    strategy::Strategy,
    utils::{
        common::{require_bps, require_non_zero},
        error::{invariant_err, VaultError, VaultResult},
    },
};

impl Vault {
    fn require_debt_ratio_room(&self, current: u64, requested: u64) -> VaultResult<()> {
        let total = self.debt_ratio - current + requested;
        if total > MAX_BPS {
            return Err(invariant_err(format!(
                "Debt ratios would sum to {} bps, above {} bps.",
                total, MAX_BPS
            )));
        }
        Ok(())
    }

    fn record_mut(&mut self, strategy: Address) -> VaultResult<&mut StrategyRecord> {
        self.strategies
            .get_mut(&strategy)
            .ok_or(VaultError::NonExistentValue)
    }

    /// The record of `strategy`, unless a migration retired it.
    fn live_record(&self, strategy: Address) -> VaultResult<&StrategyRecord> {
        let record = self
            .strategies
            .get(&strategy)
            .ok_or(VaultError::NonExistentValue)?;
        if record.migrated {
            return Err(invariant_err("A migrated strategy cannot be reactivated."));
        }
        Ok(record)
    }

    fn live_record_mut(&mut self, strategy: Address) -> VaultResult<&mut StrategyRecord> {
        self.live_record(strategy)?;
        self.record_mut(strategy)
    }

    /// Registers `strategy` and appends it to the withdrawal queue.
    pub(crate) fn add_strategy(
        &mut self,
        caller: Address,
        strategy: &Strategy,
        params: StrategyParams,
        now: u64,
    ) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;

        let address = require_non_zero(strategy.address())?;
        if self.emergency_shutdown {
            return Err(invariant_err("Cannot add a strategy during emergency shutdown."));
        }
        if self.withdrawal_queue.len() >= MAXIMUM_STRATEGIES {
            return Err(invariant_err("The withdrawal queue is full."));
        }
        if self.strategies.contains_key(&address) {
            return Err(invariant_err("The strategy was already added to this vault."));
        }
        if strategy.status().is_migrated() {
            return Err(invariant_err("A migrated strategy cannot be added again."));
        }
        if strategy.binding().vault != self.address() {
            return Err(invariant_err("The strategy is bound to another vault."));
        }
        if strategy.binding().want != self.want() {
            return Err(invariant_err("The strategy manages a different want."));
        }
        self.require_debt_ratio_room(0, params.debt_ratio)?;
        if params.min_debt_per_harvest > params.max_debt_per_harvest {
            return Err(invariant_err("Min debt per harvest is above the max."));
        }
        require_bps(params.performance_fee, MAX_PERFORMANCE_FEE, "Performance fee")?;

        self.strategies
            .insert(address, StrategyRecord::new(&params, now));
        self.debt_ratio += params.debt_ratio;
        self.withdrawal_queue.push(address);
        Ok(())
    }

    /// Changes the allocation of a strategy. Funds move on its next harvest.
    pub(crate) fn update_strategy_debt_ratio(
        &mut self,
        caller: Address,
        strategy: Address,
        debt_ratio: u64,
    ) -> VaultResult<()> {
        self.authority().require(caller, VAULT_MANAGERS)?;
        let record = self.live_record(strategy)?;
        if record.emergency_exit && debt_ratio > 0 {
            return Err(invariant_err("A strategy in emergency exit keeps a zero debt ratio."));
        }
        let current = record.debt_ratio;
        self.require_debt_ratio_room(current, debt_ratio)?;

        self.debt_ratio = self.debt_ratio - current + debt_ratio;
        self.record_mut(strategy)?.debt_ratio = debt_ratio;
        Ok(())
    }

    pub(crate) fn update_strategy_min_debt_per_harvest(
        &mut self,
        caller: Address,
        strategy: Address,
        min_debt_per_harvest: U256,
    ) -> VaultResult<()> {
        self.authority().require(caller, VAULT_MANAGERS)?;
        let record = self.live_record_mut(strategy)?;
        if min_debt_per_harvest > record.max_debt_per_harvest {
            return Err(invariant_err("Min debt per harvest is above the max."));
        }
        record.min_debt_per_harvest = min_debt_per_harvest;
        Ok(())
    }

    pub(crate) fn update_strategy_max_debt_per_harvest(
        &mut self,
        caller: Address,
        strategy: Address,
        max_debt_per_harvest: U256,
    ) -> VaultResult<()> {
        self.authority().require(caller, VAULT_MANAGERS)?;
        let record = self.live_record_mut(strategy)?;
        if record.min_debt_per_harvest > max_debt_per_harvest {
            return Err(invariant_err("Max debt per harvest is below the min."));
        }
        record.max_debt_per_harvest = max_debt_per_harvest;
        Ok(())
    }

    pub(crate) fn update_strategy_performance_fee(
        &mut self,
        caller: Address,
        strategy: Address,
        performance_fee: u64,
    ) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        require_bps(performance_fee, MAX_PERFORMANCE_FEE, "Performance fee")?;
        self.live_record_mut(strategy)?.performance_fee = performance_fee;
        Ok(())
    }

    /// Zeroes the allocation of `strategy`. The strategy itself may revoke.
    pub(crate) fn revoke_strategy(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        let mut authority = self.authority();
        authority.strategy = Some(strategy);
        authority.require(caller, &[Role::Strategy, Role::Governance, Role::Guardian])?;
        self.revoke(strategy)
    }

    pub(crate) fn revoke(&mut self, strategy: Address) -> VaultResult<()> {
        let record = self.record_mut(strategy)?;
        let current = record.debt_ratio;
        record.debt_ratio = 0;
        self.debt_ratio -= current;
        Ok(())
    }

    /// Revokes `strategy` and records its emergency exit, when it has a record here.
    pub(crate) fn mark_emergency_exit(&mut self, strategy: Address) -> VaultResult<()> {
        if !self.strategies.contains_key(&strategy) {
            return Ok(());
        }
        self.revoke(strategy)?;
        self.record_mut(strategy)?.emergency_exit = true;
        Ok(())
    }

    /// Appends a registered strategy back to the withdrawal queue.
    pub(crate) fn add_strategy_to_queue(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.authority().require(caller, VAULT_MANAGERS)?;
        self.live_record(strategy)?;
        if self.withdrawal_queue.contains(&strategy) {
            return Err(invariant_err("The strategy is already queued."));
        }
        if self.withdrawal_queue.len() >= MAXIMUM_STRATEGIES {
            return Err(invariant_err("The withdrawal queue is full."));
        }
        self.withdrawal_queue.push(strategy);
        Ok(())
    }

    /// Removes a strategy from the withdrawal queue. Its record stays.
    pub(crate) fn remove_strategy_from_queue(
        &mut self,
        caller: Address,
        strategy: Address,
    ) -> VaultResult<()> {
        self.authority().require(caller, VAULT_MANAGERS)?;
        let position = self
            .withdrawal_queue
            .iter()
            .position(|queued| *queued == strategy)
            .ok_or(VaultError::NonExistentValue)?;
        self.withdrawal_queue.remove(position);
        Ok(())
    }

    /// Replaces the withdrawal order. Every entry must be registered, unique and not migrated.
    pub(crate) fn set_withdrawal_queue(&mut self, caller: Address, queue: Vec<Address>) -> VaultResult<()> {
        self.authority().require(caller, VAULT_MANAGERS)?;
        if queue.len() > MAXIMUM_STRATEGIES {
            return Err(invariant_err("The withdrawal queue is full."));
        }
        for (index, strategy) in queue.iter().enumerate() {
            self.live_record(*strategy)?;
            if queue[..index].contains(strategy) {
                return Err(invariant_err("The withdrawal queue has a duplicate."));
            }
        }
        self.withdrawal_queue = queue;
        Ok(())
    }

    pub(crate) fn set_deposit_limit(&mut self, caller: Address, limit: U256) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        self.deposit_limit = limit;
        Ok(())
    }

    pub(crate) fn set_management_fee(&mut self, caller: Address, fee: u64) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        require_bps(fee, MAX_BPS, "Management fee")?;
        self.management_fee = fee;
        Ok(())
    }

    pub(crate) fn set_performance_fee(&mut self, caller: Address, fee: u64) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        require_bps(fee, MAX_PERFORMANCE_FEE, "Performance fee")?;
        self.performance_fee = fee;
        Ok(())
    }

    pub(crate) fn set_locked_profit_degradation(
        &mut self,
        caller: Address,
        degradation: U256,
    ) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        if degradation > degradation_coefficient() {
            return Err(invariant_err("Degradation is above the coefficient."));
        }
        self.locked_profit_degradation = degradation;
        Ok(())
    }

    pub(crate) fn set_management(&mut self, caller: Address, management: Address) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        self.settings.management = require_non_zero(management)?;
        Ok(())
    }

    pub(crate) fn set_guardian(&mut self, caller: Address, guardian: Address) -> VaultResult<()> {
        self.authority()
            .require(caller, &[Role::Governance, Role::Guardian])?;
        self.settings.guardian = require_non_zero(guardian)?;
        Ok(())
    }

    pub(crate) fn set_rewards(&mut self, caller: Address, rewards: Address) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        if rewards == self.address() {
            return Err(invariant_err("The vault cannot be its own fee recipient."));
        }
        self.settings.rewards = require_non_zero(rewards)?;
        Ok(())
    }

    /// Nominates a new governance. Takes effect once accepted.
    pub(crate) fn set_governance(&mut self, caller: Address, governance: Address) -> VaultResult<()> {
        self.authority().require(caller, GOVERNANCE)?;
        self.pending_governance = Some(require_non_zero(governance)?);
        Ok(())
    }

    pub(crate) fn accept_governance(&mut self, caller: Address) -> VaultResult<()> {
        match self.pending_governance {
            Some(pending) if pending == caller => {
                self.settings.governance = pending;
                self.pending_governance = None;
                Ok(())
            }
            _ => Err(VaultError::Unauthorized),
        }
    }

    /// Turning shutdown on is open to the guardian. Only governance turns it off.
    pub(crate) fn set_emergency_shutdown(&mut self, caller: Address, active: bool) -> VaultResult<()> {
        if active {
            self.authority()
                .require(caller, &[Role::Governance, Role::Guardian])?;
        } else {
            self.authority().require(caller, GOVERNANCE)?;
        }
        self.emergency_shutdown = active;
        Ok(())
    }
}
