//! Deployment configuration.
//!
//! A `ProtocolConfig` is read from JSON and describes one vault together with the
//! strategies deployed against it. Omitted values fall back to the protocol defaults.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    clock::Clock,
    constants::{
        default_locked_profit_degradation, degradation_coefficient, default_max_report_delay,
        DEFAULT_DECIMALS, DEFAULT_MANAGEMENT_FEE, DEFAULT_MIN_REPORT_DELAY, DEFAULT_PERFORMANCE_FEE,
        DEFAULT_PROFIT_FACTOR, MAX_BPS, MAX_PERFORMANCE_FEE,
    },
    state::Protocol,
    strategy::{Binding, GaugeAdapter, HoldAdapter, Strategy, StrategyAdapter, StrategySettings},
    utils::{
        common::{require_bps, require_non_zero},
        error::{invariant_err, VaultError, VaultResult},
    },
    vault::{Vault, VaultSettings},
};

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

fn default_management_fee() -> u64 {
    DEFAULT_MANAGEMENT_FEE
}

fn default_performance_fee() -> u64 {
    DEFAULT_PERFORMANCE_FEE
}

fn default_deposit_limit() -> U256 {
    U256::MAX
}

fn default_profit_factor() -> u64 {
    DEFAULT_PROFIT_FACTOR
}

fn default_min_report_delay() -> u64 {
    DEFAULT_MIN_REPORT_DELAY
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VaultConfig {
    pub address: Address,
    pub want: Address,
    pub governance: Address,
    #[serde(default)]
    pub management: Option<Address>,
    #[serde(default)]
    pub guardian: Option<Address>,
    #[serde(default)]
    pub rewards: Option<Address>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default = "default_management_fee")]
    pub management_fee: u64,
    #[serde(default = "default_performance_fee")]
    pub performance_fee: u64,
    #[serde(default = "default_deposit_limit")]
    pub deposit_limit: U256,
    #[serde(default = "default_locked_profit_degradation")]
    pub locked_profit_degradation: U256,
}

impl VaultConfig {
    /// Builds a vault activated at `now`.
    pub fn build(&self, now: u64) -> VaultResult<Vault> {
        require_non_zero(self.address)?;
        require_non_zero(self.want)?;
        let governance = require_non_zero(self.governance)?;
        require_bps(self.management_fee, MAX_BPS, "Management fee")?;
        require_bps(self.performance_fee, MAX_PERFORMANCE_FEE, "Performance fee")?;
        if self.locked_profit_degradation > degradation_coefficient() {
            return Err(invariant_err("Locked profit degradation is above the coefficient."));
        }

        let mut settings = VaultSettings::new(self.address, self.want, governance);
        settings
            .name(self.name.clone())
            .symbol(self.symbol.clone())
            .decimals(self.decimals)
            .management(self.management.unwrap_or(governance))
            .guardian(self.guardian.unwrap_or(governance))
            .rewards(self.rewards.unwrap_or(governance));

        let mut vault = Vault::new(settings, now);
        vault.management_fee = self.management_fee;
        vault.performance_fee = self.performance_fee;
        vault.deposit_limit = self.deposit_limit;
        vault.locked_profit_degradation = self.locked_profit_degradation;
        Ok(vault)
    }
}

/// Position logic of a configured strategy
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterConfig {
    Hold { name: String },
    Gauge { name: String, venue: Address },
}

impl AdapterConfig {
    fn build(&self) -> VaultResult<Box<dyn StrategyAdapter>> {
        Ok(match self {
            AdapterConfig::Hold { name } => Box::new(HoldAdapter::new(name.clone())),
            AdapterConfig::Gauge { name, venue } => {
                Box::new(GaugeAdapter::new(name.clone(), require_non_zero(*venue)?))
            }
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct StrategyConfig {
    pub address: Address,
    pub strategist: Address,
    #[serde(default)]
    pub keeper: Option<Address>,
    #[serde(default)]
    pub rewards: Option<Address>,
    #[serde(default = "default_min_report_delay")]
    pub min_report_delay: u64,
    #[serde(default = "default_max_report_delay")]
    pub max_report_delay: u64,
    #[serde(default = "default_profit_factor")]
    pub profit_factor: u64,
    #[serde(default)]
    pub debt_threshold: U256,
    #[serde(default)]
    pub health_check: Option<Address>,
    #[serde(default)]
    pub metadata_uri: String,
    pub adapter: AdapterConfig,
}

impl StrategyConfig {
    /// Builds the strategy bound to `vault` and its want.
    pub fn build(&self, vault: &VaultConfig) -> VaultResult<Strategy> {
        let binding = Binding::new(require_non_zero(self.address)?, vault.address, vault.want);
        let strategist = require_non_zero(self.strategist)?;

        let mut settings = StrategySettings::new(binding, strategist);
        settings
            .keeper(self.keeper.unwrap_or(strategist))
            .rewards(self.rewards.unwrap_or(strategist))
            .min_report_delay(self.min_report_delay)
            .max_report_delay(self.max_report_delay)
            .profit_factor(self.profit_factor)
            .debt_threshold(self.debt_threshold)
            .health_check(self.health_check)
            .metadata_uri(self.metadata_uri.clone());

        Ok(Strategy::new(settings, self.adapter.build()?))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub vault: VaultConfig,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl ProtocolConfig {
    pub fn from_json(json: &str) -> VaultResult<Self> {
        serde_json::from_str(json).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
    }

    /// Starts a protocol with the configured vault and deploys every configured strategy.
    /// Strategies still have to be added to the vault by governance.
    pub fn into_protocol(self, clock: Arc<dyn Clock>) -> VaultResult<Protocol> {
        let vault = self.vault.build(clock.now())?;
        let deployer = vault.settings.governance;
        let mut protocol = Protocol::from_vault(vault, clock);
        for strategy in &self.strategies {
            protocol.deploy_strategy(deployer, strategy.build(&self.vault)?)?;
        }
        Ok(protocol)
    }
}
