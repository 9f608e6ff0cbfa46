//! In-memory settlement layer.
//!
//! Models the substrate the vault runs on: token balances with exclusive-ownership
//! transfers, allowances, and pro-rata staking venues. A venue is identified by its
//! address; its receipt token uses the same address, and the want it holds is its
//! liquidity. Rewards accrue per (venue, token, holder) until claimed.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::utils::{common::mul_div, error::*};

#[derive(Clone, Default, Debug)]
pub struct Settlement {
    balances: BTreeMap<(Address, Address), U256>,
    supplies: BTreeMap<Address, U256>,
    allowances: BTreeMap<(Address, Address, Address), U256>,
    claimable: BTreeMap<(Address, Address, Address), U256>,
}

impl Settlement {
    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.supplies.get(&token).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Moves `amount` of `token` from `from` to `to`. Fails without effect if `from` cannot cover it.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> VaultResult<()> {
        if amount == U256::ZERO || from == to {
            return Ok(());
        }
        let from_balance = self.balance_of(token, from);
        if from_balance < amount {
            return Err(VaultError::InsufficientBalance(format!(
                "{} holds {} of {}, {} requested.",
                from, from_balance, token, amount
            )));
        }
        self.balances.insert((token, from), from_balance - amount);
        let to_balance = self.balance_of(token, to);
        self.balances.insert((token, to), to_balance + amount);
        Ok(())
    }

    /// Transfers on behalf of `owner`, consuming the spender's allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> VaultResult<()> {
        let allowance = self.allowance(token, owner, spender);
        if allowance < amount {
            return Err(VaultError::Unauthorized);
        }
        self.transfer(token, owner, to, amount)?;
        if allowance != U256::MAX {
            self.allowances
                .insert((token, owner, spender), allowance - amount);
        }
        Ok(())
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        if amount == U256::ZERO {
            self.allowances.remove(&(token, owner, spender));
        } else {
            self.allowances.insert((token, owner, spender), amount);
        }
    }

    /// Creates `amount` of `token` out of thin air. Models inflows from outside the system.
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> VaultResult<()> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or_else(|| arithmetic_err("Token supply overflowed."))?;
        self.supplies.insert(token, supply);
        let balance = self.balance_of(token, to);
        self.balances.insert((token, to), balance + amount);
        Ok(())
    }

    pub fn burn(&mut self, token: Address, from: Address, amount: U256) -> VaultResult<()> {
        let balance = self.balance_of(token, from);
        if balance < amount {
            return Err(VaultError::InsufficientBalance(format!(
                "Cannot burn {} of {} held by {}.",
                amount, token, from
            )));
        }
        self.balances.insert((token, from), balance - amount);
        let supply = self.total_supply(token);
        self.supplies.insert(token, supply.saturating_sub(amount));
        Ok(())
    }

    /// Want-denominated value of `holder`'s receipts in `venue`.
    pub fn quote(&self, venue: Address, want: Address, holder: Address) -> U256 {
        let receipts = self.balance_of(venue, holder);
        let supply = self.total_supply(venue);
        if receipts == U256::ZERO || supply == U256::ZERO {
            return U256::ZERO;
        }
        // A read-only quote degrades to zero rather than failing.
        mul_div(receipts, self.balance_of(want, venue), supply).unwrap_or(U256::ZERO)
    }

    /// Deposits `amount` of want into `venue` and mints receipts pro rata.
    pub fn stake(
        &mut self,
        venue: Address,
        want: Address,
        holder: Address,
        amount: U256,
    ) -> VaultResult<U256> {
        if amount == U256::ZERO {
            return Ok(U256::ZERO);
        }
        let liquidity = self.balance_of(want, venue);
        let supply = self.total_supply(venue);
        let receipts = if supply == U256::ZERO || liquidity == U256::ZERO {
            amount
        } else {
            mul_div(amount, supply, liquidity)?
        };
        self.transfer(want, holder, venue, amount)?;
        self.mint(venue, holder, receipts)?;
        Ok(receipts)
    }

    /// Burns up to `receipts` of `holder`'s receipts and returns the want paid out.
    pub fn unstake(
        &mut self,
        venue: Address,
        want: Address,
        holder: Address,
        receipts: U256,
    ) -> VaultResult<U256> {
        let receipts = receipts.min(self.balance_of(venue, holder));
        if receipts == U256::ZERO {
            return Ok(U256::ZERO);
        }
        let supply = self.total_supply(venue);
        let payout = mul_div(receipts, self.balance_of(want, venue), supply)?;
        self.burn(venue, holder, receipts)?;
        self.transfer(want, venue, holder, payout)?;
        Ok(payout)
    }

    /// Receipts needed to redeem `amount` of want, rounded up.
    pub fn receipts_for(&self, venue: Address, want: Address, amount: U256) -> U256 {
        let liquidity = self.balance_of(want, venue);
        if liquidity == U256::ZERO {
            return U256::ZERO;
        }
        let supply = self.total_supply(venue);
        let numerator = amount.saturating_mul(supply);
        let receipts = numerator / liquidity;
        if receipts * liquidity < numerator {
            receipts + U256::from(1)
        } else {
            receipts
        }
    }

    /// Records a reward for `holder` that becomes a balance once claimed.
    pub fn accrue(&mut self, venue: Address, token: Address, holder: Address, amount: U256) {
        let key = (venue, token, holder);
        let current = self.claimable.get(&key).copied().unwrap_or(U256::ZERO);
        self.claimable.insert(key, current.saturating_add(amount));
    }

    pub fn claimable(&self, venue: Address, token: Address, holder: Address) -> U256 {
        self.claimable
            .get(&(venue, token, holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Pays out every pending reward of `holder` in `venue`. Returns (token, amount) pairs.
    pub fn claim(&mut self, venue: Address, holder: Address) -> VaultResult<Vec<(Address, U256)>> {
        let keys: Vec<(Address, Address, Address)> = self
            .claimable
            .range((venue, Address::ZERO, Address::ZERO)..)
            .take_while(|((v, _, _), _)| *v == venue)
            .filter(|((_, _, h), _)| *h == holder)
            .map(|(key, _)| *key)
            .collect();

        let mut claimed = vec![];
        for key in keys {
            if let Some(amount) = self.claimable.remove(&key) {
                self.mint(key.1, holder, amount)?;
                claimed.push((key.1, amount));
            }
        }
        Ok(claimed)
    }
}
