//! The strategy base wrapped around every adapter.
//!
//! Owns the harvest sequence: the adapter prepares a return (or unwinds when exiting), the
//! health check gates it, the vault commits it, and only then is the position adjusted.

use alloy_primitives::{Address, U256};

use super::{
    adapter::{AdapterContext, PreparedReturn, StrategyAdapter},
    data::StrategyData,
    settings::{Binding, StrategySettings},
    status::{Lifecycle, StrategyStatus},
    trigger::{evaluate, TriggerInputs, TriggerReason},
};
use crate::{
    access::{Authority, Role, AUTHORIZED, EMERGENCY_AUTHORIZED, KEEPERS, VAULT_MANAGERS},
    constants::API_VERSION,
    health::{HealthCheckContext, HealthCheckRegistry},
    journal::{JournalCollection, LogType},
    settlement::Settlement,
    utils::{
        common::require_non_zero,
        error::{invariant_err, VaultError, VaultResult},
    },
    vault::{ReportArgs, Vault},
};

/// Result of a committed harvest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub profit: U256,
    pub loss: U256,
    pub debt_payment: U256,
    pub debt_outstanding: U256,
    pub credit: U256,
    pub fees: U256,
}

#[derive(Clone, Debug)]
pub struct Strategy {
    pub settings: StrategySettings,
    pub data: StrategyData,
    adapter: Box<dyn StrategyAdapter>,
}

impl Strategy {
    pub fn new(settings: StrategySettings, adapter: Box<dyn StrategyAdapter>) -> Self {
        Self {
            settings,
            data: StrategyData::default(),
            adapter,
        }
    }

    pub fn address(&self) -> Address {
        self.settings.binding.strategy
    }

    pub fn binding(&self) -> &Binding {
        &self.settings.binding
    }

    pub fn status(&self) -> StrategyStatus {
        self.data.status
    }

    pub fn name(&self) -> String {
        self.adapter.name()
    }

    pub fn api_version(&self) -> &'static str {
        API_VERSION
    }

    /// The concrete adapter, if it is a `T`
    pub fn adapter_as<T: 'static>(&self) -> Option<&T> {
        self.adapter.as_any().downcast_ref::<T>()
    }

    pub fn adapter_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.adapter.as_any_mut().downcast_mut::<T>()
    }

    /// Roles of this strategy, resolved against its vault
    pub fn authority(&self, vault: &Vault) -> Authority {
        Authority {
            strategist: Some(self.settings.strategist),
            keeper: Some(self.settings.keeper),
            strategy: Some(self.address()),
            ..vault.authority()
        }
    }

    pub fn estimated_total_assets(&self, settlement: &Settlement) -> U256 {
        self.adapter
            .estimated_total_assets(&self.settings.binding, settlement)
    }

    pub fn delegated_assets(&self, settlement: &Settlement) -> U256 {
        self.adapter
            .delegated_assets(&self.settings.binding, settlement)
    }

    /// `true` while the strategy has an allocation or still manages assets.
    /// A migrated strategy is never active.
    pub fn is_active(&self, vault: &Vault, settlement: &Settlement) -> bool {
        if self.data.status.is_migrated() {
            return false;
        }
        vault
            .strategy(self.address())
            .is_some_and(|record| record.debt_ratio > 0)
            || self.estimated_total_assets(settlement) > U256::ZERO
    }

    pub fn lifecycle(&self, vault: &Vault) -> Lifecycle {
        Lifecycle::derive(self.data.status, vault.strategy(self.address()))
    }

    pub fn trigger_inputs(&self, vault: &Vault, settlement: &Settlement, now: u64) -> TriggerInputs {
        let record = vault.strategy(self.address());
        TriggerInputs {
            force_harvest_trigger_once: self.data.force_harvest_trigger_once,
            emergency_exit: self.data.status.is_exiting(),
            registered: record.is_some() && !self.data.status.is_migrated(),
            estimated_total_assets: self.estimated_total_assets(settlement),
            total_debt: record.map(|record| record.total_debt).unwrap_or_default(),
            debt_outstanding: vault.debt_outstanding(self.address()).unwrap_or_default(),
            elapsed: now.saturating_sub(record.map(|record| record.last_report).unwrap_or(now)),
            min_report_delay: self.settings.min_report_delay,
            max_report_delay: self.settings.max_report_delay,
            profit_factor: self.settings.profit_factor,
            debt_threshold: self.settings.debt_threshold,
        }
    }

    /// Why a harvest is due, if it is
    pub fn harvest_trigger(
        &self,
        vault: &Vault,
        settlement: &Settlement,
        now: u64,
        call_cost: U256,
    ) -> Option<TriggerReason> {
        evaluate(&self.trigger_inputs(vault, settlement, now), call_cost)
    }

    pub fn tend_trigger(&self, settlement: &Settlement, call_cost: U256) -> bool {
        !self.data.status.is_migrated()
            && self
                .adapter
                .tend_trigger(&self.settings.binding, settlement, call_cost)
    }

    /// Harvests the strategy and reports the result to `vault`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn harvest(
        &mut self,
        caller: Address,
        vault: &mut Vault,
        settlement: &mut Settlement,
        health_checks: &HealthCheckRegistry,
        now: u64,
        journal: &mut JournalCollection,
    ) -> VaultResult<HarvestReport> {
        self.authority(vault).require(caller, KEEPERS)?;
        self.data.status.require_operational()?;

        let address = self.address();
        let total_debt = vault
            .strategy(address)
            .ok_or(VaultError::NonExistentValue)?
            .total_debt;
        let debt_outstanding = vault.debt_outstanding(address)?;
        let exiting = self.data.status.is_exiting();

        let prepared = {
            let mut ctx = AdapterContext::new(self.settings.binding, settlement, journal);
            if exiting {
                let freed = self.adapter.liquidate_all_positions(&mut ctx)?;
                exit_return(freed, debt_outstanding)
            } else {
                self.adapter
                    .prepare_return(&mut ctx, debt_outstanding, total_debt)?
            }
        };
        if prepared.profit > U256::ZERO && prepared.loss > U256::ZERO {
            return Err(invariant_err("The adapter reported a profit and a loss together."));
        }

        self.check_health(health_checks, &prepared, debt_outstanding, total_debt, journal)?;

        let outcome = vault.report(
            address,
            ReportArgs {
                gain: prepared.profit,
                loss: prepared.loss,
                debt_payment: prepared.debt_payment,
                delegated_assets: self.delegated_assets(settlement),
                strategist_rewards: self.settings.rewards,
            },
            settlement,
            now,
        )?;
        journal.append_note(
            Ok(()),
            LogType::Report,
            format!(
                "Reported a profit of {}, a loss of {} and a debt payment of {}. Credit {}, fees {}.",
                prepared.profit, prepared.loss, prepared.debt_payment, outcome.credit, outcome.fees
            ),
        );

        if !exiting {
            let mut ctx = AdapterContext::new(self.settings.binding, settlement, journal);
            self.adapter
                .adjust_position(&mut ctx, outcome.credit, outcome.debt_outstanding)?;
        }
        self.data.force_harvest_trigger_once = false;

        Ok(HarvestReport {
            profit: prepared.profit,
            loss: prepared.loss,
            debt_payment: prepared.debt_payment,
            debt_outstanding: outcome.debt_outstanding,
            credit: outcome.credit,
            fees: outcome.fees,
        })
    }

    fn check_health(
        &mut self,
        health_checks: &HealthCheckRegistry,
        prepared: &PreparedReturn,
        debt_outstanding: U256,
        total_debt: U256,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        if !self.data.do_health_check {
            // A skipped check is a one-off
            self.data.do_health_check = true;
            journal.append_note(
                Ok(()),
                LogType::HealthCheck,
                "Health check skipped for this harvest and re-enabled.",
            );
            return Ok(());
        }
        let Some(reference) = self.settings.health_check else {
            return Ok(());
        };

        let context = HealthCheckContext {
            strategy: self.address(),
            debt_outstanding,
            total_debt,
        };
        let result = health_checks.validate(
            reference,
            prepared.profit,
            prepared.loss,
            prepared.debt_payment,
            &context,
        );
        journal.append_note(
            result.clone(),
            LogType::HealthCheck,
            format!(
                "Health check {} on a profit of {} and a loss of {}.",
                reference, prepared.profit, prepared.loss
            ),
        );
        result
    }

    /// Maintains the position without reporting.
    pub(crate) fn tend(
        &mut self,
        caller: Address,
        vault: &Vault,
        settlement: &mut Settlement,
        now: u64,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        self.authority(vault).require(caller, KEEPERS)?;
        self.data.status.require_operational()?;
        if self.data.status.is_exiting() {
            return Err(VaultError::InvalidTransition(
                "An exiting strategy is not tended.".to_string(),
            ));
        }

        let debt_outstanding = vault.debt_outstanding(self.address())?;
        let mut ctx = AdapterContext::new(self.settings.binding, settlement, journal);
        self.adapter.tend(&mut ctx, debt_outstanding)?;
        self.data.last_tend(now);
        Ok(())
    }

    /// Frees `amount_needed` for the vault. Returns the realized loss.
    pub(crate) fn withdraw(
        &mut self,
        caller: Address,
        amount_needed: U256,
        settlement: &mut Settlement,
        journal: &mut JournalCollection,
    ) -> VaultResult<U256> {
        if caller != self.settings.binding.vault {
            return Err(VaultError::Unauthorized);
        }
        self.data.status.require_operational()?;

        let binding = self.settings.binding;
        let mut ctx = AdapterContext::new(binding, settlement, journal);
        let (liquidated, loss) = self.adapter.liquidate_position(&mut ctx, amount_needed)?;
        let freed = liquidated.min(amount_needed).min(ctx.balance_of_want());
        let loss = loss.min(amount_needed - freed);

        settlement.transfer(binding.want, binding.strategy, binding.vault, freed)?;
        Ok(loss)
    }

    /// Hands every balance over to `new` and retires this strategy for good.
    pub(crate) fn migrate(
        &mut self,
        caller: Address,
        new: &Strategy,
        settlement: &mut Settlement,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        if caller != self.settings.binding.vault {
            return Err(VaultError::Unauthorized);
        }
        if new.binding().vault != self.settings.binding.vault
            || new.binding().want != self.settings.binding.want
        {
            return Err(invariant_err("Migration cannot rebind the vault or the want."));
        }
        let retired = self.data.status.retire()?;

        let mut ctx = AdapterContext::new(self.settings.binding, settlement, journal);
        self.adapter.prepare_migration(&mut ctx, new.address())?;
        let moved = ctx.sweep(self.settings.binding.want, new.address())?;
        ctx.note(
            LogType::Migration,
            format!("Moved {} of want to {}.", moved, new.address()),
        );

        self.data.status = retired;
        Ok(())
    }

    /// Unwinds the strategy for good. Its allocation at the vault drops to zero.
    pub(crate) fn set_emergency_exit(
        &mut self,
        caller: Address,
        vault: &mut Vault,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        self.authority(vault).require(caller, EMERGENCY_AUTHORIZED)?;
        self.data.status = self.data.status.exit()?;
        vault.mark_emergency_exit(self.address())?;
        journal.append_note(
            Ok(()),
            LogType::EmergencyExit,
            format!("Emergency exit set on {}.", self.address()),
        );
        Ok(())
    }

    pub(crate) fn set_strategist(&mut self, caller: Address, vault: &Vault, strategist: Address) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.strategist(require_non_zero(strategist)?);
        Ok(())
    }

    pub(crate) fn set_keeper(&mut self, caller: Address, vault: &Vault, keeper: Address) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.keeper(require_non_zero(keeper)?);
        Ok(())
    }

    pub(crate) fn set_rewards(&mut self, caller: Address, vault: &Vault, rewards: Address) -> VaultResult<()> {
        self.authority(vault).require(caller, &[Role::Strategist])?;
        self.settings.rewards(require_non_zero(rewards)?);
        Ok(())
    }

    pub(crate) fn set_min_report_delay(&mut self, caller: Address, vault: &Vault, delay: u64) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.min_report_delay(delay);
        Ok(())
    }

    pub(crate) fn set_max_report_delay(&mut self, caller: Address, vault: &Vault, delay: u64) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.max_report_delay(delay);
        Ok(())
    }

    pub(crate) fn set_profit_factor(&mut self, caller: Address, vault: &Vault, profit_factor: u64) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.profit_factor(profit_factor);
        Ok(())
    }

    pub(crate) fn set_debt_threshold(&mut self, caller: Address, vault: &Vault, debt_threshold: U256) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.debt_threshold(debt_threshold);
        Ok(())
    }

    pub(crate) fn set_metadata_uri(&mut self, caller: Address, vault: &Vault, metadata_uri: String) -> VaultResult<()> {
        self.authority(vault).require(caller, AUTHORIZED)?;
        self.settings.metadata_uri(metadata_uri);
        Ok(())
    }

    pub(crate) fn set_health_check(
        &mut self,
        caller: Address,
        vault: &Vault,
        health_check: Option<Address>,
    ) -> VaultResult<()> {
        self.authority(vault).require(caller, VAULT_MANAGERS)?;
        self.settings.health_check(health_check);
        Ok(())
    }

    pub(crate) fn set_do_health_check(&mut self, caller: Address, vault: &Vault, enabled: bool) -> VaultResult<()> {
        self.authority(vault).require(caller, VAULT_MANAGERS)?;
        self.data.do_health_check(enabled);
        Ok(())
    }

    pub(crate) fn set_force_harvest_trigger_once(
        &mut self,
        caller: Address,
        vault: &Vault,
        forced: bool,
    ) -> VaultResult<()> {
        self.authority(vault).require(caller, VAULT_MANAGERS)?;
        self.data.force_harvest_trigger_once(forced);
        Ok(())
    }
}

/// Return of an exiting strategy that freed `freed` against `debt_outstanding`
fn exit_return(freed: U256, debt_outstanding: U256) -> PreparedReturn {
    let (profit, loss) = if freed >= debt_outstanding {
        (freed - debt_outstanding, U256::ZERO)
    } else {
        (U256::ZERO, debt_outstanding - freed)
    };
    PreparedReturn {
        profit,
        loss,
        debt_payment: debt_outstanding - loss,
    }
}
