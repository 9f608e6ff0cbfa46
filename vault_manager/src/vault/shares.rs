//! Share issuance, deposits and withdrawals

use alloy_primitives::{Address, U256};

use super::Vault;
use crate::{
    constants::MAX_BPS,
    journal::{JournalCollection, LogType},
    settlement::Settlement,
    strategy::StrategyBook,
    utils::{
        common::{bps_of, mul_div, require_bps},
        error::{invariant_err, VaultError, VaultResult},
    },
};

/// How many shares a withdrawal burns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawAmount {
    /// Every share the caller holds
    All,
    Shares(U256),
}

impl Vault {
    /// Shares worth `amount` of free funds, rounded down. 0 when nothing is free.
    pub fn shares_for_amount(&self, amount: U256, settlement: &Settlement, now: u64) -> U256 {
        let free_funds = self.free_funds(now);
        if free_funds == U256::ZERO {
            return U256::ZERO;
        }
        mul_div(amount, self.total_supply(settlement), free_funds).unwrap_or(U256::ZERO)
    }

    /// Want value of `shares`
    pub fn share_value(&self, shares: U256, settlement: &Settlement, now: u64) -> VaultResult<U256> {
        let supply = self.total_supply(settlement);
        if supply == U256::ZERO {
            return Ok(shares);
        }
        mul_div(shares, self.free_funds(now), supply)
    }

    /// Value of one whole share
    pub fn price_per_share(&self, settlement: &Settlement, now: u64) -> VaultResult<U256> {
        let one = U256::from(10).pow(U256::from(self.settings.decimals));
        self.share_value(one, settlement, now)
    }

    /// Shares that can be redeemed right now without running out of funds
    pub fn max_available_shares(&self, settlement: &Settlement, now: u64) -> U256 {
        self.withdrawal_queue
            .iter()
            .filter_map(|strategy| self.strategies.get(strategy))
            .fold(
                self.shares_for_amount(self.total_idle, settlement, now),
                |shares, record| {
                    shares.saturating_add(self.shares_for_amount(record.total_debt, settlement, now))
                },
            )
    }

    /// Room left under the deposit limit
    pub fn available_deposit_limit(&self) -> U256 {
        self.deposit_limit.saturating_sub(self.total_assets())
    }

    /// Mints shares worth `amount` to `to`, priced before `amount` enters the vault.
    pub(crate) fn issue_shares_for_amount(
        &self,
        to: Address,
        amount: U256,
        settlement: &mut Settlement,
        now: u64,
    ) -> VaultResult<U256> {
        let supply = self.total_supply(settlement);
        let shares = if supply > U256::ZERO {
            mul_div(amount, supply, self.free_funds(now))?
        } else {
            amount
        };
        if shares == U256::ZERO {
            return Err(invariant_err("The amount is worth no shares."));
        }
        settlement.mint(self.address(), to, shares)?;
        Ok(shares)
    }

    /// Pulls `amount` of want from `caller` and mints shares to `recipient`.
    /// `U256::MAX` deposits as much of the caller's balance as the limit allows.
    pub(crate) fn deposit(
        &mut self,
        caller: Address,
        amount: U256,
        recipient: Address,
        settlement: &mut Settlement,
        now: u64,
        journal: &mut JournalCollection,
    ) -> VaultResult<U256> {
        if self.emergency_shutdown {
            return Err(invariant_err("Deposits are closed during emergency shutdown."));
        }
        if recipient == Address::ZERO || recipient == self.address() {
            return Err(invariant_err("Shares cannot be minted to this recipient."));
        }

        let amount = if amount == U256::MAX {
            self.available_deposit_limit()
                .min(settlement.balance_of(self.want(), caller))
        } else {
            amount
        };
        if amount == U256::ZERO {
            return Err(invariant_err("Cannot deposit a zero amount."));
        }
        if self.total_assets().saturating_add(amount) > self.deposit_limit {
            return Err(VaultError::DepositLimitExceeded);
        }

        let shares = self.issue_shares_for_amount(recipient, amount, settlement, now)?;
        settlement.transfer(self.want(), caller, self.address(), amount)?;
        self.total_idle += amount;

        journal.append_note(
            Ok(()),
            LogType::Deposit,
            format!("Deposited {} for {} shares to {}.", amount, shares, recipient),
        );
        Ok(shares)
    }

    /// Burns the caller's shares and pays their value to `recipient`.
    /// Idle funds go first, then strategies are drawn on in withdrawal queue order.
    /// Fails with `SlippageExceeded` when realized losses are above `max_loss` bps.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn withdraw(
        &mut self,
        caller: Address,
        request: WithdrawAmount,
        recipient: Address,
        max_loss: u64,
        strategies: &mut StrategyBook,
        settlement: &mut Settlement,
        now: u64,
        journal: &mut JournalCollection,
    ) -> VaultResult<U256> {
        require_bps(max_loss, MAX_BPS, "Max loss")?;

        let balance = self.balance_of(settlement, caller);
        let mut shares = match request {
            WithdrawAmount::All => balance,
            WithdrawAmount::Shares(shares) => shares,
        };
        if shares > balance {
            return Err(VaultError::InsufficientBalance(format!(
                "{} holds {} shares, {} requested.",
                caller, balance, shares
            )));
        }
        if shares == U256::ZERO {
            return Err(invariant_err("Cannot withdraw zero shares."));
        }

        let mut value = self.share_value(shares, settlement, now)?;
        let mut vault_balance = self.total_idle;
        let mut total_loss = U256::ZERO;

        if value > vault_balance {
            let queue = self.withdrawal_queue.clone();
            for address in queue {
                if value <= vault_balance {
                    break;
                }
                let strategy_debt = match self.strategies.get(&address) {
                    Some(record) => record.total_debt,
                    None => continue,
                };
                let amount_needed = (value - vault_balance).min(strategy_debt);
                if amount_needed == U256::ZERO {
                    continue;
                }
                let strategy = strategies
                    .get_mut(&address)
                    .ok_or(VaultError::NonExistentValue)?;

                let pre_balance = settlement.balance_of(self.want(), self.address());
                let loss = strategy.withdraw(self.address(), amount_needed, settlement, journal)?;
                let withdrawn = settlement
                    .balance_of(self.want(), self.address())
                    .saturating_sub(pre_balance);
                vault_balance += withdrawn;

                if loss > U256::ZERO {
                    value = value.saturating_sub(loss);
                    total_loss += loss;
                    self.report_loss(address, loss)?;
                }

                if let Some(record) = self.strategies.get_mut(&address) {
                    record.total_debt = record.total_debt.saturating_sub(withdrawn);
                }
                self.total_debt = self.total_debt.saturating_sub(withdrawn);

                journal.append_note(
                    Ok(()),
                    LogType::Withdrawal,
                    format!(
                        "Withdrew {} from strategy {} with a loss of {}.",
                        withdrawn, address, loss
                    ),
                );
            }
            self.total_idle = vault_balance;

            if value > vault_balance {
                value = vault_balance;
                shares = self
                    .shares_for_amount(value + total_loss, settlement, now)
                    .min(balance);
            }

            if total_loss > bps_of(value + total_loss, max_loss)? {
                return Err(VaultError::SlippageExceeded(format!(
                    "Realized a loss of {} on {} against a tolerance of {} bps.",
                    total_loss,
                    value + total_loss,
                    max_loss
                )));
            }
        }

        settlement.burn(self.address(), caller, shares)?;
        self.total_idle -= value;
        settlement.transfer(self.want(), self.address(), recipient, value)?;

        journal.append_note(
            Ok(()),
            LogType::Withdrawal,
            format!("Burned {} shares of {} for {} to {}.", shares, caller, value, recipient),
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::tests::{vault, want};

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn journal() -> JournalCollection {
        JournalCollection::open(0, None)
    }

    #[test]
    fn genesis_deposit_is_one_to_one() {
        let mut vault = vault(0);
        let mut settlement = Settlement::default();
        settlement.mint(want(), alice(), U256::from(1_000)).unwrap();

        let shares = vault
            .deposit(alice(), U256::from(400), alice(), &mut settlement, 0, &mut journal())
            .unwrap();
        assert_eq!(shares, U256::from(400));
        assert_eq!(vault.total_idle(), U256::from(400));
        assert_eq!(vault.balance_of(&settlement, alice()), U256::from(400));
        assert_eq!(
            vault.price_per_share(&settlement, 0).unwrap(),
            U256::from(10).pow(U256::from(18))
        );
    }

    #[test]
    fn deposit_limit_is_enforced() {
        let mut vault = vault(0);
        vault.deposit_limit = U256::from(100);
        let mut settlement = Settlement::default();
        settlement.mint(want(), alice(), U256::from(1_000)).unwrap();

        assert_eq!(
            vault.deposit(alice(), U256::from(101), alice(), &mut settlement, 0, &mut journal()),
            Err(VaultError::DepositLimitExceeded)
        );
        // max deposits up to the limit
        let shares = vault
            .deposit(alice(), U256::MAX, alice(), &mut settlement, 0, &mut journal())
            .unwrap();
        assert_eq!(shares, U256::from(100));
        assert_eq!(vault.available_deposit_limit(), U256::ZERO);
    }

    #[test]
    fn zero_and_shutdown_deposits_fail() {
        let mut vault = vault(0);
        let mut settlement = Settlement::default();
        settlement.mint(want(), alice(), U256::from(10)).unwrap();

        assert!(matches!(
            vault.deposit(alice(), U256::ZERO, alice(), &mut settlement, 0, &mut journal()),
            Err(VaultError::InvariantViolation(_))
        ));
        vault.emergency_shutdown = true;
        assert!(matches!(
            vault.deposit(alice(), U256::from(1), alice(), &mut settlement, 0, &mut journal()),
            Err(VaultError::InvariantViolation(_))
        ));
    }

    #[test]
    fn withdraw_from_idle_burns_and_pays() {
        let mut vault = vault(0);
        let mut settlement = Settlement::default();
        let mut strategies = StrategyBook::new();
        settlement.mint(want(), alice(), U256::from(1_000)).unwrap();
        vault
            .deposit(alice(), U256::from(1_000), alice(), &mut settlement, 0, &mut journal())
            .unwrap();

        let paid = vault
            .withdraw(
                alice(),
                WithdrawAmount::Shares(U256::from(250)),
                alice(),
                1,
                &mut strategies,
                &mut settlement,
                0,
                &mut journal(),
            )
            .unwrap();
        assert_eq!(paid, U256::from(250));
        assert_eq!(settlement.balance_of(want(), alice()), U256::from(250));
        assert_eq!(vault.total_idle(), U256::from(750));

        let result = vault.withdraw(
            alice(),
            WithdrawAmount::Shares(U256::from(751)),
            alice(),
            1,
            &mut strategies,
            &mut settlement,
            0,
            &mut journal(),
        );
        assert!(matches!(result, Err(VaultError::InsufficientBalance(_))));
    }
}
