//! Harvest trigger evaluation.
//!
//! A pure function of a snapshot of strategy and vault state. Keepers use it to decide
//! whether a harvest is worth its call cost; `harvest` itself never consults it.

use alloy_primitives::U256;
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Snapshot of everything the trigger depends on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerInputs {
    pub force_harvest_trigger_once: bool,
    pub emergency_exit: bool,
    /// `false` if the strategy has no record at the vault
    pub registered: bool,
    pub estimated_total_assets: U256,
    pub total_debt: U256,
    pub debt_outstanding: U256,
    /// Seconds since the strategy's last report
    pub elapsed: u64,
    pub min_report_delay: u64,
    pub max_report_delay: u64,
    pub profit_factor: u64,
    pub debt_threshold: U256,
}

/// The rule that made a harvest due
#[derive(Clone, Copy, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum TriggerReason {
    Forced,
    EmergencyExit,
    MaxReportDelay,
    DebtOutstanding,
    Profitable,
}

/// Returns the first rule that fires, in priority order, or `None`.
pub fn evaluate(inputs: &TriggerInputs, call_cost: U256) -> Option<TriggerReason> {
    if inputs.force_harvest_trigger_once {
        return Some(TriggerReason::Forced);
    }
    if !inputs.registered {
        return None;
    }
    if inputs.emergency_exit {
        return (inputs.estimated_total_assets > U256::ZERO).then_some(TriggerReason::EmergencyExit);
    }
    if inputs.estimated_total_assets == U256::ZERO {
        return None;
    }
    if inputs.elapsed >= inputs.max_report_delay {
        return Some(TriggerReason::MaxReportDelay);
    }
    if inputs.elapsed < inputs.min_report_delay {
        return None;
    }
    if inputs.debt_outstanding > U256::ZERO && inputs.debt_outstanding >= inputs.debt_threshold {
        return Some(TriggerReason::DebtOutstanding);
    }

    let profit = inputs
        .estimated_total_assets
        .saturating_sub(inputs.total_debt);
    let threshold = call_cost.saturating_mul(U256::from(inputs.profit_factor));
    if profit > U256::ZERO && profit >= threshold {
        return Some(TriggerReason::Profitable);
    }
    None
}
