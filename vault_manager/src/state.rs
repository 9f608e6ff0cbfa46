//! Protocol state and its transaction boundary.
//!
//! `VaultState` is the whole aggregate: settlement, vault, strategies and health checks.
//! `Protocol` owns it together with the clock, the journal and the halt status. Every
//! mutating entry point clones the state, runs against the clone and swaps it in only on
//! success, so a failed operation leaves no trace but its journal entries.

use std::sync::Arc;

use alloy_primitives::{Address, U256};

use crate::{
    access::{GOVERNANCE, VAULT_MANAGERS},
    clock::Clock,
    constants::DEFAULT_MAX_LOSS,
    halt::{stale_strategies, Halt},
    health::{HealthCheck, HealthCheckRegistry},
    journal::{Journal, JournalCollection, LogType},
    settlement::Settlement,
    strategy::{Binding, GaugeAdapter, HarvestReport, Lifecycle, Strategy, StrategyBook, TriggerReason},
    types::{StrategyQuery, VaultQuery},
    utils::error::{invariant_err, VaultError, VaultResult},
    vault::{StrategyParams, Vault, VaultSettings, WithdrawAmount},
};

#[derive(Clone)]
pub struct VaultState {
    pub settlement: Settlement,
    pub vault: Vault,
    pub strategies: StrategyBook,
    pub health_checks: HealthCheckRegistry,
}

impl VaultState {
    pub fn new(vault: Vault) -> Self {
        Self {
            settlement: Settlement::default(),
            vault,
            strategies: StrategyBook::new(),
            health_checks: HealthCheckRegistry::default(),
        }
    }

    fn strategy(&self, strategy: Address) -> VaultResult<&Strategy> {
        self.strategies
            .get(&strategy)
            .ok_or(VaultError::NonExistentValue)
    }

    fn harvest(
        &mut self,
        caller: Address,
        strategy: Address,
        now: u64,
        journal: &mut JournalCollection,
    ) -> VaultResult<HarvestReport> {
        let target = self
            .strategies
            .get_mut(&strategy)
            .ok_or(VaultError::NonExistentValue)?;
        target.harvest(
            caller,
            &mut self.vault,
            &mut self.settlement,
            &self.health_checks,
            now,
            journal,
        )
    }

    fn migrate(
        &mut self,
        caller: Address,
        old: Address,
        new: Address,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        if old == new {
            return Err(invariant_err("A strategy cannot migrate to itself."));
        }
        if !self.strategies.contains_key(&new) {
            return Err(VaultError::NonExistentValue);
        }
        let mut old_strategy = self
            .strategies
            .remove(&old)
            .ok_or(VaultError::NonExistentValue)?;
        let new_strategy = self
            .strategies
            .get(&new)
            .ok_or(VaultError::NonExistentValue)?;

        let result = self.vault.migrate_strategy(
            caller,
            &mut old_strategy,
            new_strategy,
            &mut self.settlement,
            journal,
        );
        self.strategies.insert(old, old_strategy);
        result
    }
}

/// Handle to a running protocol instance
pub struct Protocol {
    state: VaultState,
    clock: Arc<dyn Clock>,
    journal: Journal,
    halt: Halt,
}

impl Protocol {
    pub fn new(settings: VaultSettings, clock: Arc<dyn Clock>) -> Self {
        let vault = Vault::new(settings, clock.now());
        Self::from_vault(vault, clock)
    }

    pub fn from_vault(vault: Vault, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: VaultState::new(vault),
            clock,
            journal: Journal::default(),
            halt: Halt::default(),
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Runs `f` as one transaction and journals its result either way.
    fn execute<T, F>(
        &mut self,
        caller: Address,
        strategy: Option<Address>,
        operation: &str,
        f: F,
    ) -> VaultResult<T>
    where
        F: FnOnce(&mut VaultState, u64, &mut JournalCollection) -> VaultResult<T>,
    {
        let now = self.clock.now();
        let mut journal = JournalCollection::open(now, strategy);
        journal.caller(caller);

        let result = self.halt.require_functional().and_then(|_| {
            let mut working = self.state.clone();
            let result = f(&mut working, now, &mut journal);
            if result.is_ok() {
                self.state = working;
            }
            result
        });

        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        };
        journal.append_note(
            outcome,
            LogType::ExecutionResult,
            format!(
                "{} {}.",
                operation,
                if result.is_ok() { "committed" } else { "reverted" }
            ),
        );
        self.journal.commit(journal, self.clock.now());
        result
    }

    // ---------------------------------------------------------------------
    // Substrate
    // ---------------------------------------------------------------------

    /// Deploys `strategy`. It still has to be added to the vault to receive funds.
    /// Deployment is permissionless; `caller` is only journaled.
    pub fn deploy_strategy(&mut self, caller: Address, strategy: Strategy) -> VaultResult<Address> {
        let address = strategy.address();
        self.execute(caller, Some(address), "Deploy strategy", |state, _, journal| {
            if address == Address::ZERO || state.strategies.contains_key(&address) {
                return Err(invariant_err("A strategy is already deployed at this address."));
            }
            journal.append_note(
                Ok(()),
                LogType::Info,
                format!("Deployed {} at {}.", strategy.name(), address),
            );
            state.strategies.insert(address, strategy);
            Ok(address)
        })
    }

    /// Deploys a health check collaborator at `address`.
    pub fn register_health_check(
        &mut self,
        caller: Address,
        address: Address,
        check: Arc<dyn HealthCheck>,
    ) -> VaultResult<()> {
        self.execute(caller, None, "Register health check", |state, _, _| {
            state.vault.authority().require(caller, GOVERNANCE)?;
            state.health_checks.register(address, check)
        })
    }

    /// Direct access to balances. Models flows from outside the protocol such as yield
    /// landing in a venue or a user funding their account.
    pub fn settlement_mut(&mut self) -> &mut Settlement {
        &mut self.state.settlement
    }

    /// Stores a collection produced outside a transaction, such as a keeper job.
    pub fn commit_journal(&mut self, collection: JournalCollection) {
        self.journal.commit(collection, self.clock.now());
    }

    // ---------------------------------------------------------------------
    // Vault entry points
    // ---------------------------------------------------------------------

    pub fn deposit(&mut self, caller: Address, amount: U256, recipient: Address) -> VaultResult<U256> {
        self.execute(caller, None, "Deposit", |state, now, journal| {
            state
                .vault
                .deposit(caller, amount, recipient, &mut state.settlement, now, journal)
        })
    }

    /// Withdraws with `max_loss` bps of tolerated loss, 1 bps by default.
    pub fn withdraw(
        &mut self,
        caller: Address,
        amount: WithdrawAmount,
        recipient: Address,
        max_loss: Option<u64>,
    ) -> VaultResult<U256> {
        self.execute(caller, None, "Withdraw", |state, now, journal| {
            state.vault.withdraw(
                caller,
                amount,
                recipient,
                max_loss.unwrap_or(DEFAULT_MAX_LOSS),
                &mut state.strategies,
                &mut state.settlement,
                now,
                journal,
            )
        })
    }

    pub fn add_strategy(
        &mut self,
        caller: Address,
        strategy: Address,
        params: StrategyParams,
    ) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Add strategy", |state, now, _| {
            let target = state
                .strategies
                .get(&strategy)
                .ok_or(VaultError::NonExistentValue)?;
            state.vault.add_strategy(caller, target, params, now)
        })
    }

    pub fn update_strategy_debt_ratio(
        &mut self,
        caller: Address,
        strategy: Address,
        debt_ratio: u64,
    ) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Update debt ratio", |state, _, _| {
            state
                .vault
                .update_strategy_debt_ratio(caller, strategy, debt_ratio)
        })
    }

    pub fn update_strategy_min_debt_per_harvest(
        &mut self,
        caller: Address,
        strategy: Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Update min debt per harvest", |state, _, _| {
            state
                .vault
                .update_strategy_min_debt_per_harvest(caller, strategy, amount)
        })
    }

    pub fn update_strategy_max_debt_per_harvest(
        &mut self,
        caller: Address,
        strategy: Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Update max debt per harvest", |state, _, _| {
            state
                .vault
                .update_strategy_max_debt_per_harvest(caller, strategy, amount)
        })
    }

    pub fn update_strategy_performance_fee(
        &mut self,
        caller: Address,
        strategy: Address,
        fee: u64,
    ) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Update performance fee", |state, _, _| {
            state
                .vault
                .update_strategy_performance_fee(caller, strategy, fee)
        })
    }

    pub fn revoke_strategy(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Revoke strategy", |state, _, _| {
            state.vault.revoke_strategy(caller, strategy)
        })
    }

    pub fn add_strategy_to_queue(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Queue strategy", |state, _, _| {
            state.vault.add_strategy_to_queue(caller, strategy)
        })
    }

    pub fn remove_strategy_from_queue(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Dequeue strategy", |state, _, _| {
            state.vault.remove_strategy_from_queue(caller, strategy)
        })
    }

    pub fn set_withdrawal_queue(&mut self, caller: Address, queue: Vec<Address>) -> VaultResult<()> {
        self.execute(caller, None, "Set withdrawal queue", |state, _, _| {
            state.vault.set_withdrawal_queue(caller, queue)
        })
    }

    pub fn set_deposit_limit(&mut self, caller: Address, limit: U256) -> VaultResult<()> {
        self.execute(caller, None, "Set deposit limit", |state, _, _| {
            state.vault.set_deposit_limit(caller, limit)
        })
    }

    pub fn set_management_fee(&mut self, caller: Address, fee: u64) -> VaultResult<()> {
        self.execute(caller, None, "Set management fee", |state, _, _| {
            state.vault.set_management_fee(caller, fee)
        })
    }

    pub fn set_performance_fee(&mut self, caller: Address, fee: u64) -> VaultResult<()> {
        self.execute(caller, None, "Set performance fee", |state, _, _| {
            state.vault.set_performance_fee(caller, fee)
        })
    }

    pub fn set_locked_profit_degradation(&mut self, caller: Address, degradation: U256) -> VaultResult<()> {
        self.execute(caller, None, "Set locked profit degradation", |state, _, _| {
            state.vault.set_locked_profit_degradation(caller, degradation)
        })
    }

    pub fn set_management(&mut self, caller: Address, management: Address) -> VaultResult<()> {
        self.execute(caller, None, "Set management", |state, _, _| {
            state.vault.set_management(caller, management)
        })
    }

    pub fn set_guardian(&mut self, caller: Address, guardian: Address) -> VaultResult<()> {
        self.execute(caller, None, "Set guardian", |state, _, _| {
            state.vault.set_guardian(caller, guardian)
        })
    }

    pub fn set_vault_rewards(&mut self, caller: Address, rewards: Address) -> VaultResult<()> {
        self.execute(caller, None, "Set vault rewards", |state, _, _| {
            state.vault.set_rewards(caller, rewards)
        })
    }

    pub fn set_governance(&mut self, caller: Address, governance: Address) -> VaultResult<()> {
        self.execute(caller, None, "Nominate governance", |state, _, _| {
            state.vault.set_governance(caller, governance)
        })
    }

    pub fn accept_governance(&mut self, caller: Address) -> VaultResult<()> {
        self.execute(caller, None, "Accept governance", |state, _, _| {
            state.vault.accept_governance(caller)
        })
    }

    pub fn set_emergency_shutdown(&mut self, caller: Address, active: bool) -> VaultResult<()> {
        self.execute(caller, None, "Set emergency shutdown", |state, _, _| {
            state.vault.set_emergency_shutdown(caller, active)
        })
    }

    /// Migrates `old` to `new`. A residual balance on `old` reverts and halts the
    /// protocol until governance resumes it.
    pub fn migrate_strategy(&mut self, caller: Address, old: Address, new: Address) -> VaultResult<()> {
        let result = self.execute(caller, Some(old), "Migrate strategy", |state, _, journal| {
            state.migrate(caller, old, new, journal)
        });
        if let Err(VaultError::MigrationIncomplete(message)) = &result {
            let now = self.clock.now();
            self.halt.halt(now, message.clone());
            let mut journal = JournalCollection::open(now, Some(old));
            journal.caller(caller).append_note(
                result.clone(),
                LogType::Migration,
                "Protocol halted pending manual reconciliation.",
            );
            self.journal.commit(journal, now);
        }
        result
    }

    /// Lifts a halt. Governance only, and the only entry point open while halted.
    pub fn resume(&mut self, caller: Address) -> VaultResult<()> {
        self.state.vault.authority().require(caller, GOVERNANCE)?;
        let now = self.clock.now();
        let mut journal = JournalCollection::open(now, None);
        journal
            .caller(caller)
            .append_note(Ok(()), LogType::Info, "Protocol resumed.");
        self.journal.commit(journal, now);
        self.halt.resume();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Strategy entry points
    // ---------------------------------------------------------------------

    /// Harvests `strategy`. The forced trigger is consumed by any authorized attempt,
    /// committed or not.
    pub fn harvest(&mut self, caller: Address, strategy: Address) -> VaultResult<HarvestReport> {
        let result = self.execute(caller, Some(strategy), "Harvest", |state, now, journal| {
            state.harvest(caller, strategy, now, journal)
        });
        if let Err(err) = &result {
            if !matches!(
                err,
                VaultError::Unauthorized | VaultError::NonExistentValue | VaultError::Halted(_)
            ) {
                if let Some(target) = self.state.strategies.get_mut(&strategy) {
                    target.data.force_harvest_trigger_once = false;
                }
            }
        }
        result
    }

    pub fn tend(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Tend", |state, now, journal| {
            let target = state
                .strategies
                .get_mut(&strategy)
                .ok_or(VaultError::NonExistentValue)?;
            target.tend(caller, &state.vault, &mut state.settlement, now, journal)
        })
    }

    pub fn set_emergency_exit(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.execute(caller, Some(strategy), "Emergency exit", |state, _, journal| {
            let target = state
                .strategies
                .get_mut(&strategy)
                .ok_or(VaultError::NonExistentValue)?;
            target.set_emergency_exit(caller, &mut state.vault, journal)
        })
    }

    /// Runs a strategy setter as a transaction
    fn update_strategy<F>(&mut self, caller: Address, strategy: Address, operation: &str, f: F) -> VaultResult<()>
    where
        F: FnOnce(&mut Strategy, &Vault) -> VaultResult<()>,
    {
        self.execute(caller, Some(strategy), operation, |state, _, _| {
            let target = state
                .strategies
                .get_mut(&strategy)
                .ok_or(VaultError::NonExistentValue)?;
            f(target, &state.vault)
        })
    }

    pub fn set_strategist(&mut self, caller: Address, strategy: Address, strategist: Address) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set strategist", |target, vault| {
            target.set_strategist(caller, vault, strategist)
        })
    }

    pub fn set_keeper(&mut self, caller: Address, strategy: Address, keeper: Address) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set keeper", |target, vault| {
            target.set_keeper(caller, vault, keeper)
        })
    }

    pub fn set_rewards(&mut self, caller: Address, strategy: Address, rewards: Address) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set rewards", |target, vault| {
            target.set_rewards(caller, vault, rewards)
        })
    }

    pub fn set_min_report_delay(&mut self, caller: Address, strategy: Address, delay: u64) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set min report delay", |target, vault| {
            target.set_min_report_delay(caller, vault, delay)
        })
    }

    pub fn set_max_report_delay(&mut self, caller: Address, strategy: Address, delay: u64) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set max report delay", |target, vault| {
            target.set_max_report_delay(caller, vault, delay)
        })
    }

    pub fn set_profit_factor(&mut self, caller: Address, strategy: Address, profit_factor: u64) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set profit factor", |target, vault| {
            target.set_profit_factor(caller, vault, profit_factor)
        })
    }

    pub fn set_debt_threshold(&mut self, caller: Address, strategy: Address, threshold: U256) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set debt threshold", |target, vault| {
            target.set_debt_threshold(caller, vault, threshold)
        })
    }

    pub fn set_metadata_uri(&mut self, caller: Address, strategy: Address, uri: String) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set metadata URI", |target, vault| {
            target.set_metadata_uri(caller, vault, uri)
        })
    }

    pub fn set_health_check(
        &mut self,
        caller: Address,
        strategy: Address,
        health_check: Option<Address>,
    ) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set health check", |target, vault| {
            target.set_health_check(caller, vault, health_check)
        })
    }

    pub fn set_do_health_check(&mut self, caller: Address, strategy: Address, enabled: bool) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Set do health check", |target, vault| {
            target.set_do_health_check(caller, vault, enabled)
        })
    }

    pub fn set_force_harvest_trigger_once(
        &mut self,
        caller: Address,
        strategy: Address,
        forced: bool,
    ) -> VaultResult<()> {
        self.update_strategy(caller, strategy, "Force harvest trigger", |target, vault| {
            target.set_force_harvest_trigger_once(caller, vault, forced)
        })
    }

    /// Runs a setter of a gauge strategy. Vault managers only.
    fn update_gauge<F>(&mut self, caller: Address, strategy: Address, operation: &str, f: F) -> VaultResult<()>
    where
        F: FnOnce(&mut GaugeAdapter, &Binding, &mut Settlement) -> VaultResult<()>,
    {
        self.execute(caller, Some(strategy), operation, |state, _, _| {
            let target = state
                .strategies
                .get_mut(&strategy)
                .ok_or(VaultError::NonExistentValue)?;
            target.authority(&state.vault).require(caller, VAULT_MANAGERS)?;
            let binding = *target.binding();
            let gauge = target
                .adapter_as_mut::<GaugeAdapter>()
                .ok_or_else(|| invariant_err("The strategy does not stake in a gauge."))?;
            f(gauge, &binding, &mut state.settlement)
        })
    }

    pub fn add_reward_token(&mut self, caller: Address, strategy: Address, token: Address) -> VaultResult<()> {
        self.update_gauge(caller, strategy, "Add reward token", |gauge, binding, settlement| {
            gauge.add_reward_token(binding, settlement, token)
        })
    }

    pub fn set_keep_reward(
        &mut self,
        caller: Address,
        strategy: Address,
        keep_reward_bps: u64,
        voter: Option<Address>,
    ) -> VaultResult<()> {
        self.update_gauge(caller, strategy, "Set kept reward", |gauge, _, _| {
            gauge.set_keep_reward(keep_reward_bps, voter)
        })
    }

    pub fn set_trade_handler(&mut self, caller: Address, strategy: Address, handler: Address) -> VaultResult<()> {
        self.update_gauge(caller, strategy, "Set trade handler", |gauge, binding, settlement| {
            gauge.set_trade_handler(binding, settlement, handler)
        })
    }

    pub fn disable_trade_handler(&mut self, caller: Address, strategy: Address) -> VaultResult<()> {
        self.update_gauge(caller, strategy, "Disable trade handler", |gauge, binding, settlement| {
            gauge.disable_trade_handler(binding, settlement);
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn vault(&self) -> &Vault {
        &self.state.vault
    }

    pub fn settlement(&self) -> &Settlement {
        &self.state.settlement
    }

    pub fn strategy(&self, strategy: Address) -> VaultResult<&Strategy> {
        self.state.strategy(strategy)
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn halt_status(&self) -> &Halt {
        &self.halt
    }

    pub fn total_assets(&self) -> U256 {
        self.state.vault.total_assets()
    }

    pub fn price_per_share(&self) -> VaultResult<U256> {
        self.state
            .vault
            .price_per_share(&self.state.settlement, self.now())
    }

    pub fn locked_profit(&self) -> U256 {
        self.state.vault.locked_profit(self.now())
    }

    pub fn available_deposit_limit(&self) -> U256 {
        self.state.vault.available_deposit_limit()
    }

    pub fn max_available_shares(&self) -> U256 {
        self.state
            .vault
            .max_available_shares(&self.state.settlement, self.now())
    }

    pub fn balance_of(&self, holder: Address) -> U256 {
        self.state.vault.balance_of(&self.state.settlement, holder)
    }

    pub fn credit_available(&self, strategy: Address) -> VaultResult<U256> {
        self.state.vault.credit_available(strategy)
    }

    pub fn debt_outstanding(&self, strategy: Address) -> VaultResult<U256> {
        self.state.vault.debt_outstanding(strategy)
    }

    pub fn expected_return(&self, strategy: Address) -> VaultResult<U256> {
        self.state.vault.expected_return(strategy, self.now())
    }

    pub fn estimated_total_assets(&self, strategy: Address) -> VaultResult<U256> {
        Ok(self
            .strategy(strategy)?
            .estimated_total_assets(&self.state.settlement))
    }

    pub fn delegated_assets(&self, strategy: Address) -> VaultResult<U256> {
        Ok(self
            .strategy(strategy)?
            .delegated_assets(&self.state.settlement))
    }

    pub fn is_active(&self, strategy: Address) -> VaultResult<bool> {
        Ok(self
            .strategy(strategy)?
            .is_active(&self.state.vault, &self.state.settlement))
    }

    pub fn lifecycle(&self, strategy: Address) -> VaultResult<Lifecycle> {
        Ok(self.strategy(strategy)?.lifecycle(&self.state.vault))
    }

    pub fn harvest_trigger(&self, strategy: Address, call_cost: U256) -> VaultResult<Option<TriggerReason>> {
        Ok(self.strategy(strategy)?.harvest_trigger(
            &self.state.vault,
            &self.state.settlement,
            self.now(),
            call_cost,
        ))
    }

    pub fn tend_trigger(&self, strategy: Address, call_cost: U256) -> VaultResult<bool> {
        Ok(self
            .strategy(strategy)?
            .tend_trigger(&self.state.settlement, call_cost))
    }

    /// Strategies that have not reported in the past `days`
    pub fn stale_strategies(&self, days: u64) -> Vec<Address> {
        stale_strategies(&self.state.vault, self.now(), days)
    }

    pub fn vault_query(&self) -> VaultResult<VaultQuery> {
        VaultQuery::build(&self.state.vault, &self.state.settlement, self.now())
    }

    pub fn strategy_query(&self, strategy: Address) -> VaultResult<StrategyQuery> {
        Ok(StrategyQuery::build(
            self.strategy(strategy)?,
            &self.state.vault,
            &self.state.settlement,
        ))
    }
}
