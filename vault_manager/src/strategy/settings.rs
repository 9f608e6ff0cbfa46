//! Strategy settings

use alloy_primitives::{Address, U256};

use crate::constants::{default_max_report_delay, DEFAULT_MIN_REPORT_DELAY, DEFAULT_PROFIT_FACTOR};

/// The identities a strategy is bound to for its whole lifetime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Binding {
    /// Identity of the strategy itself. Holds its balances in the settlement layer.
    pub strategy: Address,
    /// The vault this strategy reports to
    pub vault: Address,
    /// The asset this strategy manages
    pub want: Address,
}

impl Binding {
    pub fn new(strategy: Address, vault: Address, want: Address) -> Self {
        Self {
            strategy,
            vault,
            want,
        }
    }
}

/// Settings changed through the authorized setters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategySettings {
    pub binding: Binding,
    pub strategist: Address,
    pub keeper: Address,
    /// Recipient of the strategist fee shares
    pub rewards: Address,
    /// Minimum seconds between harvests before debt or profit can trigger one
    pub min_report_delay: u64,
    /// Seconds after which a harvest is always due
    pub max_report_delay: u64,
    /// Multiple of the call cost the profit must reach to trigger a harvest
    pub profit_factor: u64,
    /// Debt outstanding that triggers a harvest
    pub debt_threshold: U256,
    /// Health check collaborator consulted on harvest
    pub health_check: Option<Address>,
    pub metadata_uri: String,
}

impl StrategySettings {
    /// Settings of a freshly bound strategy. Every role starts with the strategist.
    pub fn new(binding: Binding, strategist: Address) -> Self {
        Self {
            binding,
            strategist,
            keeper: strategist,
            rewards: strategist,
            min_report_delay: DEFAULT_MIN_REPORT_DELAY,
            max_report_delay: default_max_report_delay(),
            profit_factor: DEFAULT_PROFIT_FACTOR,
            debt_threshold: U256::ZERO,
            health_check: None,
            metadata_uri: String::new(),
        }
    }

    /// Sets the strategist.
    pub fn strategist(&mut self, strategist: Address) -> &mut Self {
        self.strategist = strategist;
        self
    }

    /// Sets the keeper.
    pub fn keeper(&mut self, keeper: Address) -> &mut Self {
        self.keeper = keeper;
        self
    }

    /// Sets the strategist rewards recipient.
    pub fn rewards(&mut self, rewards: Address) -> &mut Self {
        self.rewards = rewards;
        self
    }

    /// Sets the minimum report delay, in seconds.
    pub fn min_report_delay(&mut self, min_report_delay: u64) -> &mut Self {
        self.min_report_delay = min_report_delay;
        self
    }

    /// Sets the maximum report delay, in seconds.
    pub fn max_report_delay(&mut self, max_report_delay: u64) -> &mut Self {
        self.max_report_delay = max_report_delay;
        self
    }

    /// Sets the profit factor.
    pub fn profit_factor(&mut self, profit_factor: u64) -> &mut Self {
        self.profit_factor = profit_factor;
        self
    }

    /// Sets the debt threshold.
    pub fn debt_threshold(&mut self, debt_threshold: U256) -> &mut Self {
        self.debt_threshold = debt_threshold;
        self
    }

    /// Sets the health check reference.
    pub fn health_check(&mut self, health_check: Option<Address>) -> &mut Self {
        self.health_check = health_check;
        self
    }

    /// Sets the metadata URI.
    pub fn metadata_uri<S: Into<String>>(&mut self, metadata_uri: S) -> &mut Self {
        self.metadata_uri = metadata_uri.into();
        self
    }
}
