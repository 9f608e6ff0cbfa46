use std::collections::BTreeMap;

use alloy_primitives::Address;

pub(crate) mod adapter;
pub(crate) mod base;
pub(crate) mod data;
pub(crate) mod gauge;
pub(crate) mod hold;
pub(crate) mod settings;
pub(crate) mod status;
pub(crate) mod trigger;

pub use adapter::{AdapterContext, PreparedReturn, StrategyAdapter};
pub use base::{HarvestReport, Strategy};
pub use data::StrategyData;
pub use gauge::GaugeAdapter;
pub use hold::HoldAdapter;
pub use settings::{Binding, StrategySettings};
pub use status::{Lifecycle, StrategyStatus};
pub use trigger::{evaluate, TriggerInputs, TriggerReason};

/// Deployed strategies, by identity
pub type StrategyBook = BTreeMap<Address, Strategy>;
