mod access;
mod clock;
mod config;
mod constants;
mod halt;
mod health;
mod journal;
mod keeper;
mod settlement;
mod state;
mod strategy;
mod types;
mod utils;
mod vault;

#[cfg(test)]
mod scenarios;

pub use access::{Authority, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AdapterConfig, ProtocolConfig, StrategyConfig, VaultConfig};
pub use halt::{Halt, HaltStatus};
pub use health::{CommonHealthCheck, HealthCheck, HealthCheckContext, HealthCheckRegistry, Limits};
pub use journal::{Journal, JournalCollection, JournalEntry, LogType};
pub use keeper::{Keeper, KeeperOutcome, Lock};
pub use settlement::Settlement;
pub use state::{Protocol, VaultState};
pub use strategy::{
    AdapterContext, Binding, GaugeAdapter, HarvestReport, HoldAdapter, Lifecycle, PreparedReturn,
    Strategy, StrategyAdapter, StrategyBook, StrategyData, StrategySettings, StrategyStatus,
    TriggerInputs, TriggerReason, evaluate,
};
pub use types::{StrategyParamsInput, StrategyQuery, StrategyRecordQuery, VaultQuery};
pub use utils::error::{VaultError, VaultResult};
pub use vault::{StrategyParams, StrategyRecord, Vault, VaultSettings, WithdrawAmount};
