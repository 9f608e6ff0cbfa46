//! Per-strategy accounting held by the vault

use alloy_primitives::U256;

/// Parameters supplied when a strategy is added to the vault
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrategyParams {
    /// Share of vault assets the strategy may hold, in bps
    pub debt_ratio: u64,
    /// Credit below this amount is not extended during a harvest
    pub min_debt_per_harvest: U256,
    /// Upper bound on credit extended during a single harvest
    pub max_debt_per_harvest: U256,
    /// Strategist share of gains, in bps
    pub performance_fee: u64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            debt_ratio: 0,
            min_debt_per_harvest: U256::ZERO,
            max_debt_per_harvest: U256::MAX,
            performance_fee: 0,
        }
    }
}

impl StrategyParams {
    /// Sets the debt ratio.
    pub fn debt_ratio(&mut self, debt_ratio: u64) -> &mut Self {
        self.debt_ratio = debt_ratio;
        self
    }

    /// Sets the minimum debt per harvest.
    pub fn min_debt_per_harvest(&mut self, min_debt_per_harvest: U256) -> &mut Self {
        self.min_debt_per_harvest = min_debt_per_harvest;
        self
    }

    /// Sets the maximum debt per harvest.
    pub fn max_debt_per_harvest(&mut self, max_debt_per_harvest: U256) -> &mut Self {
        self.max_debt_per_harvest = max_debt_per_harvest;
        self
    }

    /// Sets the strategist performance fee.
    pub fn performance_fee(&mut self, performance_fee: u64) -> &mut Self {
        self.performance_fee = performance_fee;
        self
    }
}

/// Struct containing the vault's view of one strategy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyRecord {
    pub performance_fee: u64,
    /// Timestamp of the addition to the vault
    pub activation: u64,
    pub debt_ratio: u64,
    pub min_debt_per_harvest: U256,
    pub max_debt_per_harvest: U256,
    /// Timestamp of the last report
    pub last_report: u64,
    pub total_debt: U256,
    pub total_gain: U256,
    pub total_loss: U256,
    /// Mirrors the strategy's emergency exit. Target debt stays at zero while set.
    pub emergency_exit: bool,
    /// Set on a migration source. A retired record is never allocated again.
    pub migrated: bool,
}

impl StrategyRecord {
    pub fn new(params: &StrategyParams, now: u64) -> Self {
        Self {
            performance_fee: params.performance_fee,
            activation: now,
            debt_ratio: params.debt_ratio,
            min_debt_per_harvest: params.min_debt_per_harvest,
            max_debt_per_harvest: params.max_debt_per_harvest,
            last_report: now,
            ..Default::default()
        }
    }

    /// The record a migration destination starts from.
    /// Allocation and debt carry over, realized history does not.
    pub fn inherit(&self) -> Self {
        Self {
            performance_fee: self.performance_fee,
            activation: self.last_report,
            debt_ratio: self.debt_ratio,
            min_debt_per_harvest: self.min_debt_per_harvest,
            max_debt_per_harvest: self.max_debt_per_harvest,
            last_report: self.last_report,
            total_debt: self.total_debt,
            total_gain: U256::ZERO,
            total_loss: U256::ZERO,
            emergency_exit: false,
            migrated: false,
        }
    }
}
