use candid::{CandidType, Nat};
use serde::{Deserialize, Serialize};

use crate::{
    settlement::Settlement,
    strategy::{Lifecycle, Strategy},
    utils::{
        common::{nat_to_u256, u256_to_nat},
        error::{VaultError, VaultResult},
    },
    vault::{StrategyParams, StrategyRecord, Vault},
};

#[derive(CandidType, Clone, Debug, Deserialize, Serialize)]
pub struct StrategyParamsInput {
    pub debt_ratio: u64,
    pub min_debt_per_harvest: Nat,
    /// `None` leaves the per-harvest credit unbounded
    pub max_debt_per_harvest: Option<Nat>,
    pub performance_fee: u64,
}

impl TryFrom<StrategyParamsInput> for StrategyParams {
    type Error = VaultError;

    fn try_from(value: StrategyParamsInput) -> Result<Self, Self::Error> {
        let mut params = StrategyParams::default();
        params
            .debt_ratio(value.debt_ratio)
            .min_debt_per_harvest(nat_to_u256(&value.min_debt_per_harvest)?)
            .performance_fee(value.performance_fee);
        if let Some(max) = value.max_debt_per_harvest {
            params.max_debt_per_harvest(nat_to_u256(&max)?);
        }
        Ok(params)
    }
}

#[derive(CandidType, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct StrategyRecordQuery {
    pub performance_fee: u64,
    pub activation: u64,
    pub debt_ratio: u64,
    pub min_debt_per_harvest: Nat,
    pub max_debt_per_harvest: Nat,
    pub last_report: u64,
    pub total_debt: Nat,
    pub total_gain: Nat,
    pub total_loss: Nat,
}

impl From<&StrategyRecord> for StrategyRecordQuery {
    fn from(value: &StrategyRecord) -> Self {
        Self {
            performance_fee: value.performance_fee,
            activation: value.activation,
            debt_ratio: value.debt_ratio,
            min_debt_per_harvest: u256_to_nat(&value.min_debt_per_harvest),
            max_debt_per_harvest: u256_to_nat(&value.max_debt_per_harvest),
            last_report: value.last_report,
            total_debt: u256_to_nat(&value.total_debt),
            total_gain: u256_to_nat(&value.total_gain),
            total_loss: u256_to_nat(&value.total_loss),
        }
    }
}

#[derive(CandidType, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VaultQuery {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub want: String,
    pub decimals: u8,
    pub governance: String,
    pub management: String,
    pub guardian: String,
    pub rewards: String,
    pub total_assets: Nat,
    pub total_idle: Nat,
    pub total_debt: Nat,
    pub total_supply: Nat,
    pub price_per_share: Nat,
    pub debt_ratio: u64,
    pub management_fee: u64,
    pub performance_fee: u64,
    pub deposit_limit: Nat,
    pub locked_profit: Nat,
    pub last_report: u64,
    pub emergency_shutdown: bool,
    pub withdrawal_queue: Vec<String>,
}

impl VaultQuery {
    pub fn build(vault: &Vault, settlement: &Settlement, now: u64) -> VaultResult<Self> {
        let settings = &vault.settings;
        Ok(Self {
            address: settings.address.to_string(),
            name: settings.name.clone(),
            symbol: settings.symbol.clone(),
            want: settings.want.to_string(),
            decimals: settings.decimals,
            governance: settings.governance.to_string(),
            management: settings.management.to_string(),
            guardian: settings.guardian.to_string(),
            rewards: settings.rewards.to_string(),
            total_assets: u256_to_nat(&vault.total_assets()),
            total_idle: u256_to_nat(&vault.total_idle()),
            total_debt: u256_to_nat(&vault.total_debt()),
            total_supply: u256_to_nat(&vault.total_supply(settlement)),
            price_per_share: u256_to_nat(&vault.price_per_share(settlement, now)?),
            debt_ratio: vault.debt_ratio(),
            management_fee: vault.management_fee(),
            performance_fee: vault.performance_fee(),
            deposit_limit: u256_to_nat(&vault.deposit_limit()),
            locked_profit: u256_to_nat(&vault.locked_profit(now)),
            last_report: vault.last_report(),
            emergency_shutdown: vault.emergency_shutdown(),
            withdrawal_queue: vault
                .withdrawal_queue()
                .iter()
                .map(|strategy| strategy.to_string())
                .collect(),
        })
    }
}

#[derive(CandidType, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct StrategyQuery {
    pub address: String,
    pub name: String,
    pub api_version: String,
    pub vault: String,
    pub want: String,
    pub strategist: String,
    pub keeper: String,
    pub rewards: String,
    pub health_check: Option<String>,
    pub metadata_uri: String,
    pub lifecycle: Lifecycle,
    pub estimated_total_assets: Nat,
    pub delegated_assets: Nat,
    pub last_tend: Option<u64>,
    pub record: Option<StrategyRecordQuery>,
}

impl StrategyQuery {
    pub fn build(strategy: &Strategy, vault: &Vault, settlement: &Settlement) -> Self {
        let settings = &strategy.settings;
        Self {
            address: strategy.address().to_string(),
            name: strategy.name(),
            api_version: strategy.api_version().to_string(),
            vault: settings.binding.vault.to_string(),
            want: settings.binding.want.to_string(),
            strategist: settings.strategist.to_string(),
            keeper: settings.keeper.to_string(),
            rewards: settings.rewards.to_string(),
            health_check: settings.health_check.map(|check| check.to_string()),
            metadata_uri: settings.metadata_uri.clone(),
            lifecycle: strategy.lifecycle(vault),
            estimated_total_assets: u256_to_nat(&strategy.estimated_total_assets(settlement)),
            delegated_assets: u256_to_nat(&strategy.delegated_assets(settlement)),
            last_tend: strategy.data.last_tend,
            record: vault.strategy(strategy.address()).map(StrategyRecordQuery::from),
        }
    }
}
