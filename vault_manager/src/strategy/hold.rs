//! Adapter that keeps want idle

use std::any::Any;

use alloy_primitives::{Address, U256};

use super::{
    adapter::{AdapterContext, StrategyAdapter},
    settings::Binding,
};
use crate::{settlement::Settlement, utils::error::VaultResult};

/// Holds the credit it receives. Profit only comes from inflows to the strategy's balance.
#[derive(Clone, Debug, Default)]
pub struct HoldAdapter {
    name: String,
}

impl HoldAdapter {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

impl StrategyAdapter for HoldAdapter {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn estimated_total_assets(&self, binding: &Binding, settlement: &Settlement) -> U256 {
        settlement.balance_of(binding.want, binding.strategy)
    }

    fn adjust_position(
        &mut self,
        _ctx: &mut AdapterContext,
        _credit_available: U256,
        _debt_outstanding: U256,
    ) -> VaultResult<()> {
        Ok(())
    }

    fn liquidate_position(
        &mut self,
        ctx: &mut AdapterContext,
        amount_needed: U256,
    ) -> VaultResult<(U256, U256)> {
        let liquidated = ctx.balance_of_want().min(amount_needed);
        Ok((liquidated, amount_needed - liquidated))
    }

    fn liquidate_all_positions(&mut self, ctx: &mut AdapterContext) -> VaultResult<U256> {
        Ok(ctx.balance_of_want())
    }

    fn prepare_migration(&mut self, _ctx: &mut AdapterContext, _new_strategy: Address) -> VaultResult<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn StrategyAdapter> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
