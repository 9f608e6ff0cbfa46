//! Adapter staking want into a reward-emitting venue.
//!
//! Idle want above what the vault is owed is staked. Rewards are claimed on every harvest;
//! `keep_reward_bps` of each non-want reward goes to the voter and the rest stays on the
//! strategy, where an optional trade handler may pull it through settlement allowances.

use std::any::Any;

use alloy_primitives::{Address, U256};

use super::{
    adapter::{AdapterContext, StrategyAdapter},
    settings::Binding,
};
use crate::{
    constants::MAX_BPS,
    journal::LogType,
    settlement::Settlement,
    utils::{
        common::{bps_of, require_bps, require_non_zero},
        error::{invariant_err, VaultResult},
    },
};

#[derive(Clone, Debug, Default)]
pub struct GaugeAdapter {
    name: String,
    /// Staking venue, also the address of its receipt token
    venue: Address,
    reward_tokens: Vec<Address>,
    keep_reward_bps: u64,
    voter: Option<Address>,
    trade_handler: Option<Address>,
}

impl GaugeAdapter {
    pub fn new<S: Into<String>>(name: S, venue: Address) -> Self {
        Self {
            name: name.into(),
            venue,
            ..Default::default()
        }
    }

    pub fn venue(&self) -> Address {
        self.venue
    }

    pub fn reward_tokens(&self) -> &[Address] {
        &self.reward_tokens
    }

    pub fn keep_reward_bps(&self) -> u64 {
        self.keep_reward_bps
    }

    pub fn voter(&self) -> Option<Address> {
        self.voter
    }

    pub fn trade_handler(&self) -> Option<Address> {
        self.trade_handler
    }

    /// Registers a reward token. The trade handler, if any, may pull it right away.
    pub fn add_reward_token(
        &mut self,
        binding: &Binding,
        settlement: &mut Settlement,
        token: Address,
    ) -> VaultResult<()> {
        let token = require_non_zero(token)?;
        if token == binding.want || token == self.venue {
            return Err(invariant_err("Want and receipts are not reward tokens."));
        }
        if self.reward_tokens.contains(&token) {
            return Ok(());
        }
        if let Some(handler) = self.trade_handler {
            settlement.approve(token, binding.strategy, handler, U256::MAX);
        }
        self.reward_tokens.push(token);
        Ok(())
    }

    /// Sets the share of each reward kept for the voter.
    pub fn set_keep_reward(&mut self, keep_reward_bps: u64, voter: Option<Address>) -> VaultResult<()> {
        require_bps(keep_reward_bps, MAX_BPS, "Kept reward")?;
        if keep_reward_bps > 0 && voter.is_none() {
            return Err(invariant_err("Kept rewards need a voter."));
        }
        self.keep_reward_bps = keep_reward_bps;
        self.voter = voter.map(require_non_zero).transpose()?;
        Ok(())
    }

    /// Replaces the trade handler and moves every reward allowance to it.
    pub fn set_trade_handler(
        &mut self,
        binding: &Binding,
        settlement: &mut Settlement,
        handler: Address,
    ) -> VaultResult<()> {
        let handler = require_non_zero(handler)?;
        self.revoke_trade_handler(binding, settlement);
        for token in &self.reward_tokens {
            settlement.approve(*token, binding.strategy, handler, U256::MAX);
        }
        self.trade_handler = Some(handler);
        Ok(())
    }

    /// Revokes the trade handler's allowances.
    pub fn disable_trade_handler(&mut self, binding: &Binding, settlement: &mut Settlement) {
        self.revoke_trade_handler(binding, settlement);
        self.trade_handler = None;
    }

    fn revoke_trade_handler(&self, binding: &Binding, settlement: &mut Settlement) {
        if let Some(handler) = self.trade_handler {
            for token in &self.reward_tokens {
                settlement.approve(*token, binding.strategy, handler, U256::ZERO);
            }
        }
    }

    /// Registers every claimed token that is not want, so it is swept on migration.
    fn track_claimed(
        &mut self,
        binding: &Binding,
        settlement: &mut Settlement,
        claimed: &[(Address, U256)],
    ) {
        for (token, _) in claimed {
            if *token == binding.want || *token == self.venue || self.reward_tokens.contains(token) {
                continue;
            }
            if let Some(handler) = self.trade_handler {
                settlement.approve(*token, binding.strategy, handler, U256::MAX);
            }
            self.reward_tokens.push(*token);
        }
    }

    fn staked(&self, binding: &Binding, settlement: &Settlement) -> U256 {
        settlement.quote(self.venue, binding.want, binding.strategy)
    }
}

impl StrategyAdapter for GaugeAdapter {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn estimated_total_assets(&self, binding: &Binding, settlement: &Settlement) -> U256 {
        settlement
            .balance_of(binding.want, binding.strategy)
            .saturating_add(self.staked(binding, settlement))
            .saturating_add(settlement.claimable(self.venue, binding.want, binding.strategy))
    }

    fn claim_rewards(&mut self, ctx: &mut AdapterContext) -> VaultResult<()> {
        let claimed = ctx.settlement.claim(self.venue, ctx.binding.strategy)?;
        let binding = ctx.binding;
        self.track_claimed(&binding, ctx.settlement, &claimed);
        for (token, amount) in claimed {
            if token == ctx.binding.want {
                ctx.note(LogType::Harvest, format!("Claimed {} of want.", amount));
                continue;
            }
            let kept = match self.voter {
                Some(voter) => {
                    let kept = bps_of(amount, self.keep_reward_bps)?;
                    ctx.settlement
                        .transfer(token, ctx.binding.strategy, voter, kept)?;
                    kept
                }
                None => U256::ZERO,
            };
            ctx.note(
                LogType::Harvest,
                format!("Claimed {} of {}, {} kept for the voter.", amount, token, kept),
            );
        }
        Ok(())
    }

    fn adjust_position(
        &mut self,
        ctx: &mut AdapterContext,
        _credit_available: U256,
        debt_outstanding: U256,
    ) -> VaultResult<()> {
        let idle = ctx.balance_of_want();
        if idle > debt_outstanding {
            let amount = idle - debt_outstanding;
            ctx.settlement
                .stake(self.venue, ctx.binding.want, ctx.binding.strategy, amount)?;
            ctx.note(LogType::Harvest, format!("Staked {} in {}.", amount, self.venue));
        }
        Ok(())
    }

    fn liquidate_position(
        &mut self,
        ctx: &mut AdapterContext,
        amount_needed: U256,
    ) -> VaultResult<(U256, U256)> {
        let idle = ctx.balance_of_want();
        if amount_needed > idle {
            let shortfall = amount_needed - idle;
            let receipts = ctx
                .settlement
                .receipts_for(self.venue, ctx.binding.want, shortfall);
            ctx.settlement
                .unstake(self.venue, ctx.binding.want, ctx.binding.strategy, receipts)?;
        }
        let liquidated = ctx.balance_of_want().min(amount_needed);
        Ok((liquidated, amount_needed - liquidated))
    }

    fn liquidate_all_positions(&mut self, ctx: &mut AdapterContext) -> VaultResult<U256> {
        ctx.settlement
            .unstake(self.venue, ctx.binding.want, ctx.binding.strategy, U256::MAX)?;
        let claimed = ctx.settlement.claim(self.venue, ctx.binding.strategy)?;
        let binding = ctx.binding;
        self.track_claimed(&binding, ctx.settlement, &claimed);
        Ok(ctx.balance_of_want())
    }

    fn prepare_migration(&mut self, ctx: &mut AdapterContext, new_strategy: Address) -> VaultResult<()> {
        let unstaked = ctx
            .settlement
            .unstake(self.venue, ctx.binding.want, ctx.binding.strategy, U256::MAX)?;
        let claimed = ctx.settlement.claim(self.venue, ctx.binding.strategy)?;
        let binding = ctx.binding;
        self.track_claimed(&binding, ctx.settlement, &claimed);

        for token in self.reward_tokens.clone() {
            let moved = ctx.sweep(token, new_strategy)?;
            ctx.note(
                LogType::Migration,
                format!("Moved {} of reward {} to {}.", moved, token, new_strategy),
            );
        }
        self.revoke_trade_handler(&binding, ctx.settlement);
        ctx.note(
            LogType::Migration,
            format!("Unstaked {} from {} for the migration.", unstaked, self.venue),
        );
        Ok(())
    }

    fn tend_trigger(&self, binding: &Binding, settlement: &Settlement, call_cost: U256) -> bool {
        let claimable = settlement.claimable(self.venue, binding.want, binding.strategy);
        claimable > U256::ZERO && claimable > call_cost
    }

    /// Compounds claimable want back into the venue.
    fn tend(&mut self, ctx: &mut AdapterContext, debt_outstanding: U256) -> VaultResult<()> {
        self.claim_rewards(ctx)?;
        self.adjust_position(ctx, U256::ZERO, debt_outstanding)
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
