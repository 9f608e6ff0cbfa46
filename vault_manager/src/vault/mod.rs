//! The vault ledger.
//!
//! Authoritative accounting of the want pool: idle funds, per-strategy debt, fee
//! assessment and locked profit decay. Shares are a settlement token issued at the vault's
//! own address.

pub(crate) mod admin;
pub(crate) mod debt;
pub(crate) mod migration;
pub(crate) mod record;
pub(crate) mod report;
pub(crate) mod shares;

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

pub use record::{StrategyParams, StrategyRecord};
pub use report::{ReportArgs, ReportOutcome};
pub use shares::WithdrawAmount;

use crate::{
    access::Authority,
    constants::{
        default_locked_profit_degradation, degradation_coefficient, DEFAULT_DECIMALS,
        DEFAULT_MANAGEMENT_FEE, DEFAULT_PERFORMANCE_FEE,
    },
    settlement::Settlement,
};

/// Identities and metadata of a vault
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultSettings {
    /// Identity of the vault, also the address of its share token
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub want: Address,
    pub decimals: u8,
    pub governance: Address,
    pub management: Address,
    pub guardian: Address,
    /// Recipient of the vault's fee shares
    pub rewards: Address,
}

impl VaultSettings {
    pub fn new(address: Address, want: Address, governance: Address) -> Self {
        Self {
            address,
            want,
            decimals: DEFAULT_DECIMALS,
            governance,
            management: governance,
            guardian: governance,
            rewards: governance,
            ..Default::default()
        }
    }

    /// Sets the share token name.
    pub fn name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Sets the share token symbol.
    pub fn symbol<S: Into<String>>(&mut self, symbol: S) -> &mut Self {
        self.symbol = symbol.into();
        self
    }

    /// Sets the share token decimals.
    pub fn decimals(&mut self, decimals: u8) -> &mut Self {
        self.decimals = decimals;
        self
    }

    /// Sets the management identity.
    pub fn management(&mut self, management: Address) -> &mut Self {
        self.management = management;
        self
    }

    /// Sets the guardian identity.
    pub fn guardian(&mut self, guardian: Address) -> &mut Self {
        self.guardian = guardian;
        self
    }

    /// Sets the fee recipient.
    pub fn rewards(&mut self, rewards: Address) -> &mut Self {
        self.rewards = rewards;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Vault {
    pub settings: VaultSettings,
    /// Governance nominated but not yet accepted
    pub(crate) pending_governance: Option<Address>,
    pub(crate) total_idle: U256,
    pub(crate) total_debt: U256,
    /// Sum of all strategy debt ratios, in bps
    pub(crate) debt_ratio: u64,
    pub(crate) management_fee: u64,
    pub(crate) performance_fee: u64,
    pub(crate) locked_profit: U256,
    pub(crate) locked_profit_degradation: U256,
    pub(crate) deposit_limit: U256,
    pub(crate) last_report: u64,
    pub(crate) activation: u64,
    pub(crate) emergency_shutdown: bool,
    pub(crate) strategies: BTreeMap<Address, StrategyRecord>,
    /// Strategies in withdrawal order
    pub(crate) withdrawal_queue: Vec<Address>,
}

impl Vault {
    pub fn new(settings: VaultSettings, now: u64) -> Self {
        Self {
            settings,
            pending_governance: None,
            total_idle: U256::ZERO,
            total_debt: U256::ZERO,
            debt_ratio: 0,
            management_fee: DEFAULT_MANAGEMENT_FEE,
            performance_fee: DEFAULT_PERFORMANCE_FEE,
            locked_profit: U256::ZERO,
            locked_profit_degradation: default_locked_profit_degradation(),
            deposit_limit: U256::MAX,
            last_report: now,
            activation: now,
            emergency_shutdown: false,
            strategies: BTreeMap::new(),
            withdrawal_queue: vec![],
        }
    }

    pub fn address(&self) -> Address {
        self.settings.address
    }

    pub fn want(&self) -> Address {
        self.settings.want
    }

    /// Vault-level roles
    pub fn authority(&self) -> Authority {
        Authority {
            governance: self.settings.governance,
            management: self.settings.management,
            guardian: self.settings.guardian,
            vault: Some(self.settings.address),
            ..Default::default()
        }
    }

    pub fn total_assets(&self) -> U256 {
        self.total_idle.saturating_add(self.total_debt)
    }

    pub fn total_idle(&self) -> U256 {
        self.total_idle
    }

    pub fn total_debt(&self) -> U256 {
        self.total_debt
    }

    pub fn debt_ratio(&self) -> u64 {
        self.debt_ratio
    }

    pub fn management_fee(&self) -> u64 {
        self.management_fee
    }

    pub fn performance_fee(&self) -> u64 {
        self.performance_fee
    }

    pub fn deposit_limit(&self) -> U256 {
        self.deposit_limit
    }

    pub fn locked_profit_degradation(&self) -> U256 {
        self.locked_profit_degradation
    }

    pub fn last_report(&self) -> u64 {
        self.last_report
    }

    pub fn activation(&self) -> u64 {
        self.activation
    }

    pub fn emergency_shutdown(&self) -> bool {
        self.emergency_shutdown
    }

    pub fn pending_governance(&self) -> Option<Address> {
        self.pending_governance
    }

    pub fn withdrawal_queue(&self) -> &[Address] {
        &self.withdrawal_queue
    }

    pub fn strategy(&self, strategy: Address) -> Option<&StrategyRecord> {
        self.strategies.get(&strategy)
    }

    pub fn strategies(&self) -> impl Iterator<Item = (&Address, &StrategyRecord)> {
        self.strategies.iter()
    }

    /// Profit reported but not yet released to share holders
    pub fn locked_profit(&self, now: u64) -> U256 {
        let elapsed = U256::from(now.saturating_sub(self.last_report));
        let ratio = match elapsed.checked_mul(self.locked_profit_degradation) {
            Some(ratio) => ratio,
            None => return U256::ZERO,
        };
        if ratio >= degradation_coefficient() {
            return U256::ZERO;
        }
        let released = self
            .locked_profit
            .checked_mul(ratio)
            .map(|value| value / degradation_coefficient())
            .unwrap_or(self.locked_profit);
        self.locked_profit.saturating_sub(released)
    }

    /// Total assets minus the still-locked profit
    pub fn free_funds(&self, now: u64) -> U256 {
        self.total_assets().saturating_sub(self.locked_profit(now))
    }

    pub fn total_supply(&self, settlement: &Settlement) -> U256 {
        settlement.total_supply(self.address())
    }

    /// Share balance of `holder`
    pub fn balance_of(&self, settlement: &Settlement, holder: Address) -> U256 {
        settlement.balance_of(self.address(), holder)
    }
}
