//! Health check gating of harvest results.
//!
//! A health check is an external collaborator registered by address. A strategy with
//! `do_health_check` enabled and a configured reference must get an explicit approval from
//! it before its report is committed. Unknown, zero or failing references reject.

use std::{collections::BTreeMap, sync::Arc};

use alloy_primitives::{Address, U256};

use crate::{
    constants::{DEFAULT_LOSS_LIMIT_RATIO, DEFAULT_PROFIT_LIMIT_RATIO, MAX_BPS},
    utils::{
        common::{bps_of, require_bps},
        error::{VaultError, VaultResult},
    },
};

/// Ledger-side context of the result being validated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealthCheckContext {
    pub strategy: Address,
    pub debt_outstanding: U256,
    pub total_debt: U256,
}

#[cfg_attr(test, mockall::automock)]
pub trait HealthCheck: Send + Sync {
    /// `Ok(true)` approves the result. `Err` means the collaborator could not answer.
    fn check(
        &self,
        profit: U256,
        loss: U256,
        debt_payment: U256,
        context: &HealthCheckContext,
    ) -> VaultResult<bool>;
}

/// Profit and loss limits, in bps of the strategy's total debt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub profit_limit_ratio: u64,
    pub loss_limit_ratio: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            profit_limit_ratio: DEFAULT_PROFIT_LIMIT_RATIO,
            loss_limit_ratio: DEFAULT_LOSS_LIMIT_RATIO,
        }
    }
}

/// Health check bounding profit and loss relative to debt, with per-strategy overrides
#[derive(Clone, Debug, Default)]
pub struct CommonHealthCheck {
    pub limits: Limits,
    pub strategy_limits: BTreeMap<Address, Limits>,
}

impl CommonHealthCheck {
    /// Sets the default limits
    pub fn limits(&mut self, profit_limit_ratio: u64, loss_limit_ratio: u64) -> VaultResult<&mut Self> {
        self.limits = Self::validated(profit_limit_ratio, loss_limit_ratio)?;
        Ok(self)
    }

    /// Overrides the limits of one strategy
    pub fn strategy_limits(
        &mut self,
        strategy: Address,
        profit_limit_ratio: u64,
        loss_limit_ratio: u64,
    ) -> VaultResult<&mut Self> {
        let limits = Self::validated(profit_limit_ratio, loss_limit_ratio)?;
        self.strategy_limits.insert(strategy, limits);
        Ok(self)
    }

    fn validated(profit_limit_ratio: u64, loss_limit_ratio: u64) -> VaultResult<Limits> {
        require_bps(loss_limit_ratio, MAX_BPS, "Loss limit ratio")?;
        Ok(Limits {
            profit_limit_ratio,
            loss_limit_ratio,
        })
    }
}

impl HealthCheck for CommonHealthCheck {
    fn check(
        &self,
        profit: U256,
        loss: U256,
        _debt_payment: U256,
        context: &HealthCheckContext,
    ) -> VaultResult<bool> {
        let limits = self
            .strategy_limits
            .get(&context.strategy)
            .copied()
            .unwrap_or(self.limits);

        if profit > bps_of(context.total_debt, limits.profit_limit_ratio)? {
            return Ok(false);
        }
        if loss > bps_of(context.total_debt, limits.loss_limit_ratio)? {
            return Ok(false);
        }
        Ok(true)
    }
}

/// Deployed health check collaborators, by address
#[derive(Clone, Default)]
pub struct HealthCheckRegistry {
    checks: BTreeMap<Address, Arc<dyn HealthCheck>>,
}

impl HealthCheckRegistry {
    pub fn register(&mut self, address: Address, check: Arc<dyn HealthCheck>) -> VaultResult<()> {
        if address == Address::ZERO {
            return Err(VaultError::InvariantViolation(
                "A health check cannot live at the zero address.".to_string(),
            ));
        }
        self.checks.insert(address, check);
        Ok(())
    }

    pub fn contains(&self, address: Address) -> bool {
        self.checks.contains_key(&address)
    }

    /// Consults the check at `address`, failing closed on anything but an approval.
    pub fn validate(
        &self,
        address: Address,
        profit: U256,
        loss: U256,
        debt_payment: U256,
        context: &HealthCheckContext,
    ) -> VaultResult<()> {
        let check = self
            .checks
            .get(&address)
            .ok_or(VaultError::HealthCheckRejected)?;
        match check.check(profit, loss, debt_payment, context) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(VaultError::HealthCheckRejected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    fn context(total_debt: u64) -> HealthCheckContext {
        HealthCheckContext {
            strategy: Address::repeat_byte(0x11),
            debt_outstanding: U256::ZERO,
            total_debt: U256::from(total_debt),
        }
    }

    #[test]
    fn common_check_bounds_profit_and_loss() {
        let check = CommonHealthCheck::default();
        let ctx = context(100_000);

        // 1% profit and 0.01% loss of debt are the defaults
        assert!(check.check(U256::from(1_000), U256::ZERO, U256::ZERO, &ctx).unwrap());
        assert!(!check.check(U256::from(1_001), U256::ZERO, U256::ZERO, &ctx).unwrap());
        assert!(check.check(U256::ZERO, U256::from(10), U256::ZERO, &ctx).unwrap());
        assert!(!check.check(U256::ZERO, U256::from(11), U256::ZERO, &ctx).unwrap());
    }

    #[test]
    fn strategy_limits_override_defaults() {
        let mut check = CommonHealthCheck::default();
        check
            .strategy_limits(Address::repeat_byte(0x11), 100, 10_000)
            .unwrap();
        let ctx = context(100);
        assert!(check.check(U256::ZERO, U256::from(100), U256::ZERO, &ctx).unwrap());
        assert!(check.strategy_limits(Address::repeat_byte(0x11), 1, 10_001).is_err());
    }

    #[test]
    fn unknown_reference_fails_closed() {
        let registry = HealthCheckRegistry::default();
        let result = registry.validate(
            Address::repeat_byte(0x99),
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            &context(1),
        );
        assert_eq!(result, Err(VaultError::HealthCheckRejected));
    }

    #[test]
    fn unreachable_collaborator_fails_closed() {
        let mut mock = MockHealthCheck::new();
        mock.expect_check()
            .returning(|_, _, _, _| Err(VaultError::Custom("timeout".to_string())));

        let mut registry = HealthCheckRegistry::default();
        registry
            .register(Address::repeat_byte(0x42), Arc::new(mock))
            .unwrap();

        let result = registry.validate(
            Address::repeat_byte(0x42),
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            &context(1),
        );
        assert_eq!(result, Err(VaultError::HealthCheckRejected));
    }

    #[test]
    fn approval_is_forwarded_with_arguments() {
        let mut mock = MockHealthCheck::new();
        mock.expect_check()
            .with(eq(U256::from(3)), eq(U256::ZERO), eq(U256::from(7)), always())
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let mut registry = HealthCheckRegistry::default();
        registry
            .register(Address::repeat_byte(0x42), Arc::new(mock))
            .unwrap();
        assert!(registry
            .validate(
                Address::repeat_byte(0x42),
                U256::from(3),
                U256::ZERO,
                U256::from(7),
                &context(1),
            )
            .is_ok());
    }

    #[test]
    fn zero_address_cannot_be_registered() {
        let mut registry = HealthCheckRegistry::default();
        assert!(registry
            .register(Address::ZERO, Arc::new(CommonHealthCheck::default()))
            .is_err());
    }
}
