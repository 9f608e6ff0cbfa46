//! The capability every yield source binding implements.
//!
//! An adapter only moves funds held at its strategy's identity. The harvest sequence,
//! health gating and vault reporting live in `Strategy`, around the adapter.

use std::any::Any;

use alloy_primitives::{Address, U256};

use super::settings::Binding;
use crate::{
    journal::{JournalCollection, LogType},
    settlement::Settlement,
    utils::{common::net_profit_loss, error::VaultResult},
};

/// What a strategy hands to the vault on a harvest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreparedReturn {
    pub profit: U256,
    pub loss: U256,
    pub debt_payment: U256,
}

/// Mutable access to the substrate for the duration of one adapter call
pub struct AdapterContext<'a> {
    pub binding: Binding,
    pub settlement: &'a mut Settlement,
    pub journal: &'a mut JournalCollection,
}

impl<'a> AdapterContext<'a> {
    pub fn new(
        binding: Binding,
        settlement: &'a mut Settlement,
        journal: &'a mut JournalCollection,
    ) -> Self {
        Self {
            binding,
            settlement,
            journal,
        }
    }

    /// Idle want held by the strategy
    pub fn balance_of_want(&self) -> U256 {
        self.settlement
            .balance_of(self.binding.want, self.binding.strategy)
    }

    /// Sends the strategy's whole balance of `token` to `to`. Returns the amount moved.
    pub fn sweep(&mut self, token: Address, to: Address) -> VaultResult<U256> {
        let amount = self.settlement.balance_of(token, self.binding.strategy);
        self.settlement
            .transfer(token, self.binding.strategy, to, amount)?;
        Ok(amount)
    }

    pub fn note<S: AsRef<str>>(&mut self, log_type: LogType, note: S) {
        self.journal.append_note(Ok(()), log_type, note);
    }
}

pub trait StrategyAdapter: Send + Sync {
    fn name(&self) -> String;

    /// Want-equivalent value under management. Never fails.
    fn estimated_total_assets(&self, binding: &Binding, settlement: &Settlement) -> U256;

    /// Part of the estimated assets that other vaults already pay management fees on
    fn delegated_assets(&self, _binding: &Binding, _settlement: &Settlement) -> U256 {
        U256::ZERO
    }

    /// Collects pending rewards into the strategy's balances
    fn claim_rewards(&mut self, _ctx: &mut AdapterContext) -> VaultResult<()> {
        Ok(())
    }

    /// Frees what the vault is owed and realizes profit or loss against `total_debt`.
    /// Never reports a profit and a loss together.
    fn prepare_return(
        &mut self,
        ctx: &mut AdapterContext,
        debt_outstanding: U256,
        total_debt: U256,
    ) -> VaultResult<PreparedReturn> {
        self.claim_rewards(ctx)?;

        let assets = self.estimated_total_assets(&ctx.binding, ctx.settlement);
        let (unrealized_profit, loss) = net_profit_loss(assets, total_debt);

        let to_free = unrealized_profit.saturating_add(debt_outstanding);
        if to_free > ctx.balance_of_want() {
            self.liquidate_position(ctx, to_free)?;
        }

        let liquid = ctx.balance_of_want();
        let (profit, debt_payment) = if liquid < unrealized_profit {
            (liquid, U256::ZERO)
        } else {
            (unrealized_profit, (liquid - unrealized_profit).min(debt_outstanding))
        };

        Ok(PreparedReturn {
            profit,
            loss,
            debt_payment,
        })
    }

    /// Invests idle want beyond `debt_outstanding`
    fn adjust_position(
        &mut self,
        ctx: &mut AdapterContext,
        credit_available: U256,
        debt_outstanding: U256,
    ) -> VaultResult<()>;

    /// Makes up to `amount_needed` of want liquid. Returns (liquidated, loss).
    fn liquidate_position(
        &mut self,
        ctx: &mut AdapterContext,
        amount_needed: U256,
    ) -> VaultResult<(U256, U256)>;

    /// Unwinds every position. Returns the idle want afterwards.
    fn liquidate_all_positions(&mut self, ctx: &mut AdapterContext) -> VaultResult<U256>;

    /// Moves every non-want balance and position to `new_strategy`
    fn prepare_migration(&mut self, ctx: &mut AdapterContext, new_strategy: Address) -> VaultResult<()>;

    fn tend_trigger(&self, _binding: &Binding, _settlement: &Settlement, _call_cost: U256) -> bool {
        false
    }

    /// Maintains the position between harvests. Never reports.
    fn tend(&mut self, ctx: &mut AdapterContext, debt_outstanding: U256) -> VaultResult<()> {
        self.adjust_position(ctx, U256::ZERO, debt_outstanding)
    }

    fn clone_box(&self) -> Box<dyn StrategyAdapter>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn StrategyAdapter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn StrategyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StrategyAdapter({})", self.name())
    }
}
