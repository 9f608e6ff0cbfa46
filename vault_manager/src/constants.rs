//! Vault Manager's Constants

use alloy_primitives::U256;
use chrono::Duration;

/// Basis points denominator. 10_000 bps = 100%.
pub const MAX_BPS: u64 = 10_000;
pub fn max_bps() -> U256 {
    U256::from(MAX_BPS)
}

/// Seconds in a (non-leap) year, used for management fee accrual
pub const SECS_PER_YEAR: u64 = 31_556_952;

/// Scale used for the locked profit degradation ratio
pub const DEGRADATION_COEFFICIENT: u128 = 1_000_000_000_000_000_000; // e18
pub fn degradation_coefficient() -> U256 {
    U256::from(DEGRADATION_COEFFICIENT)
}

/// Default locked profit degradation: profit unlocks over roughly 6 hours
const DEFAULT_LOCKED_PROFIT_DEGRADATION_RAW: u128 = DEGRADATION_COEFFICIENT * 46 / 1_000_000;
pub fn default_locked_profit_degradation() -> U256 {
    U256::from(DEFAULT_LOCKED_PROFIT_DEGRADATION_RAW)
}

/// Version of the vault/strategy interface implemented by this crate
pub const API_VERSION: &str = "0.4.6";

/// Maximum number of strategies a vault can have in its withdrawal queue
pub const MAXIMUM_STRATEGIES: usize = 20;

/// Default vault management fee, 2% per year
pub const DEFAULT_MANAGEMENT_FEE: u64 = 200;

/// Default vault performance fee, 10% of gains
pub const DEFAULT_PERFORMANCE_FEE: u64 = 1_000;

/// Upper bound for vault and strategist performance fees
pub const MAX_PERFORMANCE_FEE: u64 = MAX_BPS / 2;

/// Default max loss accepted on a withdrawal, in bps
pub const DEFAULT_MAX_LOSS: u64 = 1;

/// Default share token decimals
pub const DEFAULT_DECIMALS: u8 = 18;

/// Default minimum seconds between harvests
pub const DEFAULT_MIN_REPORT_DELAY: u64 = 0;

/// Default maximum seconds between harvests
pub fn default_max_report_delay() -> u64 {
    Duration::days(1).num_seconds() as u64
}

/// Default profit factor, expressed as a multiple of the harvest call cost
pub const DEFAULT_PROFIT_FACTOR: u64 = 100;

/// Default profit limit of the common health check, 1% of debt
pub const DEFAULT_PROFIT_LIMIT_RATIO: u64 = 100;

/// Default loss limit of the common health check, 0.01% of debt
pub const DEFAULT_LOSS_LIMIT_RATIO: u64 = 1;

/// Max number of retry attempts for a keeper job
pub const MAX_RETRY_ATTEMPTS: u8 = 2;

/// Seconds after which an abandoned keeper lock can be taken over
pub const STRATEGY_LOCK_TIMEOUT: u64 = 3_600;

/// Number of journal collections kept before the oldest ones are pruned
pub const JOURNAL_CAPACITY: usize = 300;
