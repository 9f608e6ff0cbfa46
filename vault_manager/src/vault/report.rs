//! Strategy reports: loss recognition, fee assessment, debt settlement and locked profit

use alloy_primitives::{Address, U256};

use super::Vault;
use crate::{
    constants::{max_bps, SECS_PER_YEAR},
    settlement::Settlement,
    utils::{
        common::{bps_of, mul_div},
        error::{arithmetic_err, invariant_err, VaultError, VaultResult},
    },
};

/// A harvest result as submitted by a strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportArgs {
    pub gain: U256,
    pub loss: U256,
    pub debt_payment: U256,
    /// Part of the strategy's debt managed by other vaults, exempt from management fees
    pub delegated_assets: U256,
    /// Recipient of the strategist fee shares
    pub strategist_rewards: Address,
}

/// What the vault settled for a report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Debt the strategy should free before its next report
    pub debt_outstanding: U256,
    /// New credit sent to the strategy
    pub credit: U256,
    /// Total fees minted as shares
    pub fees: U256,
}

impl Vault {
    /// Commits a strategy's harvest result. All checks run before any state is touched.
    pub(crate) fn report(
        &mut self,
        strategy: Address,
        args: ReportArgs,
        settlement: &mut Settlement,
        now: u64,
    ) -> VaultResult<ReportOutcome> {
        let record = self
            .strategies
            .get(&strategy)
            .ok_or(VaultError::NonExistentValue)?;

        if args.gain > U256::ZERO && args.loss > U256::ZERO {
            return Err(invariant_err("A report cannot carry both a gain and a loss."));
        }
        if args.loss > record.total_debt {
            return Err(invariant_err(format!(
                "Loss of {} exceeds the strategy debt of {}.",
                args.loss, record.total_debt
            )));
        }
        let payable = args.gain.saturating_add(args.debt_payment);
        let strategy_balance = settlement.balance_of(self.want(), strategy);
        if strategy_balance < payable {
            return Err(VaultError::InsufficientBalance(format!(
                "Strategy {} holds {} of want but reported {}.",
                strategy, strategy_balance, payable
            )));
        }

        if args.loss > U256::ZERO {
            self.report_loss(strategy, args.loss)?;
        }

        let fees = self.assess_fees(strategy, &args, settlement, now)?;
        if let Some(record) = self.strategies.get_mut(&strategy) {
            record.total_gain = record.total_gain.saturating_add(args.gain);
        }

        let credit = self.credit_available(strategy)?;
        let mut debt = self.debt_outstanding(strategy)?;
        let debt_payment = args.debt_payment.min(debt);

        if debt_payment > U256::ZERO {
            self.adjust_debt(strategy, debt_payment, false);
            debt -= debt_payment;
        }
        if credit > U256::ZERO {
            self.adjust_debt(strategy, credit, true);
        }

        // One net transfer settles the gain, the debt payment and the new credit.
        let total_available = args.gain + debt_payment;
        if total_available < credit {
            let owed = credit - total_available;
            self.total_idle = self.total_idle.saturating_sub(owed);
            settlement.transfer(self.want(), self.address(), strategy, owed)?;
        } else if total_available > credit {
            let owed = total_available - credit;
            self.total_idle += owed;
            settlement.transfer(self.want(), strategy, self.address(), owed)?;
        }

        let locked_profit_before_loss = self
            .locked_profit(now)
            .saturating_add(args.gain)
            .saturating_sub(fees);
        self.locked_profit = locked_profit_before_loss.saturating_sub(args.loss);

        self.last_report = now;
        let record = self
            .strategies
            .get_mut(&strategy)
            .ok_or(VaultError::NonExistentValue)?;
        record.last_report = now;

        let debt_outstanding =
            if record.debt_ratio == 0 || self.emergency_shutdown || record.emergency_exit {
                record.total_debt
            } else {
                debt
            };

        Ok(ReportOutcome {
            debt_outstanding,
            credit,
            fees,
        })
    }

    fn adjust_debt(&mut self, strategy: Address, amount: U256, increase: bool) {
        if let Some(record) = self.strategies.get_mut(&strategy) {
            record.total_debt = if increase {
                record.total_debt.saturating_add(amount)
            } else {
                record.total_debt.saturating_sub(amount)
            };
        }
        self.total_debt = if increase {
            self.total_debt.saturating_add(amount)
        } else {
            self.total_debt.saturating_sub(amount)
        };
    }

    /// Writes `loss` off the strategy's debt and shrinks its allocation in proportion.
    pub(crate) fn report_loss(&mut self, strategy: Address, loss: U256) -> VaultResult<()> {
        let vault_debt_ratio = self.debt_ratio;
        let vault_total_debt = self.total_debt;
        let record = self
            .strategies
            .get_mut(&strategy)
            .ok_or(VaultError::NonExistentValue)?;

        if loss > record.total_debt {
            return Err(invariant_err("Loss exceeds the strategy debt."));
        }

        if vault_debt_ratio != 0 && vault_total_debt > U256::ZERO {
            let ratio_change = mul_div(loss, U256::from(vault_debt_ratio), vault_total_debt)?
                .min(U256::from(record.debt_ratio));
            let ratio_change: u64 = ratio_change.saturating_to();
            record.debt_ratio -= ratio_change;
            self.debt_ratio -= ratio_change;
        }

        record.total_loss = record.total_loss.saturating_add(loss);
        record.total_debt -= loss;
        self.total_debt = self.total_debt.saturating_sub(loss);
        Ok(())
    }

    /// Mints management, strategist and performance fees as shares. Returns the total fee.
    fn assess_fees(
        &mut self,
        strategy: Address,
        args: &ReportArgs,
        settlement: &mut Settlement,
        now: u64,
    ) -> VaultResult<U256> {
        let record = self
            .strategies
            .get(&strategy)
            .ok_or(VaultError::NonExistentValue)?;

        if record.activation == now || args.gain == U256::ZERO {
            return Ok(U256::ZERO);
        }

        let duration = U256::from(now.saturating_sub(record.last_report));
        let fee_base = record.total_debt.saturating_sub(args.delegated_assets);
        let management_fee = fee_base
            .checked_mul(duration)
            .and_then(|value| value.checked_mul(U256::from(self.management_fee)))
            .map(|value| value / max_bps() / U256::from(SECS_PER_YEAR))
            .ok_or_else(|| arithmetic_err("Management fee overflowed."))?;

        let strategist_fee = bps_of(args.gain, record.performance_fee)?;
        let performance_fee = bps_of(args.gain, self.performance_fee)?;
        let total_fee = (management_fee + strategist_fee + performance_fee).min(args.gain);

        if total_fee == U256::ZERO {
            return Ok(U256::ZERO);
        }

        let reward = self.issue_shares_for_amount(self.address(), total_fee, settlement, now)?;
        if strategist_fee > U256::ZERO && args.strategist_rewards != Address::ZERO {
            let strategist_reward = mul_div(strategist_fee, reward, total_fee)?.min(reward);
            settlement.transfer(
                self.address(),
                self.address(),
                args.strategist_rewards,
                strategist_reward,
            )?;
        }
        // Governance earns the rounding dust
        let remaining = settlement.balance_of(self.address(), self.address());
        settlement.transfer(self.address(), self.address(), self.settings.rewards, remaining)?;

        Ok(total_fee)
    }
}
