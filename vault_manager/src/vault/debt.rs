//! Credit and debt derivation between the vault and its strategies

use alloy_primitives::{Address, U256};

use super::Vault;
use crate::utils::{
    common::{bps_of, mul_div},
    error::{VaultError, VaultResult},
};

impl Vault {
    fn record_or_err(&self, strategy: Address) -> VaultResult<&super::StrategyRecord> {
        self.strategies
            .get(&strategy)
            .ok_or(VaultError::NonExistentValue)
    }

    /// Amount the strategy holds above its target debt.
    /// The full debt when the vault carries no allocation, is shut down, or the strategy exits.
    pub fn debt_outstanding(&self, strategy: Address) -> VaultResult<U256> {
        let record = self.record_or_err(strategy)?;
        if self.debt_ratio == 0 || self.emergency_shutdown || record.emergency_exit {
            return Ok(record.total_debt);
        }

        let debt_limit = bps_of(self.total_assets(), record.debt_ratio)?;
        Ok(record.total_debt.saturating_sub(debt_limit))
    }

    /// Amount of idle funds the strategy may draw on its next report
    pub fn credit_available(&self, strategy: Address) -> VaultResult<U256> {
        let record = self.record_or_err(strategy)?;
        if self.emergency_shutdown || record.emergency_exit || record.migrated {
            return Ok(U256::ZERO);
        }

        let total_assets = self.total_assets();
        let vault_debt_limit = bps_of(total_assets, self.debt_ratio)?;
        let strategy_debt_limit = bps_of(total_assets, record.debt_ratio)?;

        if strategy_debt_limit <= record.total_debt || vault_debt_limit <= self.total_debt {
            return Ok(U256::ZERO);
        }

        let available = (strategy_debt_limit - record.total_debt)
            .min(vault_debt_limit - self.total_debt)
            .min(self.total_idle);

        if available < record.min_debt_per_harvest {
            return Ok(U256::ZERO);
        }
        Ok(available.min(record.max_debt_per_harvest))
    }

    /// Gain expected at `now`, extrapolated from the strategy's realized history
    pub fn expected_return(&self, strategy: Address, now: u64) -> VaultResult<U256> {
        let record = self.record_or_err(strategy)?;
        let since_last_harvest = now.saturating_sub(record.last_report);
        let total_harvest_time = record.last_report.saturating_sub(record.activation);

        if since_last_harvest == 0 || total_harvest_time == 0 {
            return Ok(U256::ZERO);
        }
        mul_div(
            record.total_gain,
            U256::from(since_last_harvest),
            U256::from(total_harvest_time),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{tests::vault, StrategyRecord};

    fn strategy() -> Address {
        Address::repeat_byte(0x51)
    }

    fn funded(idle: u64, debt: u64, ratio: u64) -> Vault {
        let mut vault = vault(0);
        vault.total_idle = U256::from(idle);
        vault.total_debt = U256::from(debt);
        vault.debt_ratio = ratio;
        vault.strategies.insert(
            strategy(),
            StrategyRecord {
                debt_ratio: ratio,
                total_debt: U256::from(debt),
                max_debt_per_harvest: U256::MAX,
                ..Default::default()
            },
        );
        vault
    }

    #[test]
    fn credit_is_bounded_by_strategy_limit_and_idle() {
        let vault = funded(1_000, 0, 5_000);
        assert_eq!(vault.credit_available(strategy()).unwrap(), U256::from(500));

        let vault = funded(100, 900, 10_000);
        assert_eq!(vault.credit_available(strategy()).unwrap(), U256::from(100));
    }

    #[test]
    fn credit_respects_min_and_max_per_harvest() {
        let mut vault = funded(1_000, 0, 10_000);
        vault.strategies.get_mut(&strategy()).unwrap().max_debt_per_harvest = U256::from(300);
        assert_eq!(vault.credit_available(strategy()).unwrap(), U256::from(300));

        vault.strategies.get_mut(&strategy()).unwrap().min_debt_per_harvest = U256::from(2_000);
        assert_eq!(vault.credit_available(strategy()).unwrap(), U256::ZERO);
    }

    #[test]
    fn shutdown_recalls_all_debt() {
        let mut vault = funded(0, 1_000, 10_000);
        assert_eq!(vault.debt_outstanding(strategy()).unwrap(), U256::ZERO);

        vault.emergency_shutdown = true;
        assert_eq!(vault.debt_outstanding(strategy()).unwrap(), U256::from(1_000));
        assert_eq!(vault.credit_available(strategy()).unwrap(), U256::ZERO);
    }

    #[test]
    fn lowered_ratio_creates_debt_outstanding() {
        let mut vault = funded(0, 1_000, 10_000);
        vault.strategies.get_mut(&strategy()).unwrap().debt_ratio = 6_000;
        vault.debt_ratio = 6_000;
        assert_eq!(vault.debt_outstanding(strategy()).unwrap(), U256::from(400));
    }

    #[test]
    fn unknown_strategy_has_no_record() {
        let vault = vault(0);
        assert_eq!(
            vault.debt_outstanding(Address::repeat_byte(0x99)),
            Err(VaultError::NonExistentValue)
        );
    }

    #[test]
    fn expected_return_extrapolates_gain() {
        let mut vault = funded(0, 1_000, 10_000);
        let record = vault.strategies.get_mut(&strategy()).unwrap();
        record.activation = 100;
        record.last_report = 200;
        record.total_gain = U256::from(50);

        assert_eq!(vault.expected_return(strategy(), 250).unwrap(), U256::from(25));
        assert_eq!(vault.expected_return(strategy(), 200).unwrap(), U256::ZERO);
    }
}
