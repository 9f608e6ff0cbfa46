//! Mutable strategy data

use super::status::StrategyStatus;

/// Struct containing all mutable data of a strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyData {
    pub status: StrategyStatus,
    /// The health check is consulted on the next harvest
    pub do_health_check: bool,
    /// Makes the next trigger evaluation fire. Consumed by the next authorized harvest.
    pub force_harvest_trigger_once: bool,
    /// Timestamp of the last successful tend. Denominated in seconds.
    pub last_tend: Option<u64>,
}

impl Default for StrategyData {
    fn default() -> Self {
        Self {
            status: StrategyStatus::default(),
            do_health_check: true,
            force_harvest_trigger_once: false,
            last_tend: None,
        }
    }
}

impl StrategyData {
    /// Sets the health check flag.
    pub fn do_health_check(&mut self, do_health_check: bool) -> &mut Self {
        self.do_health_check = do_health_check;
        self
    }

    /// Sets the forced trigger flag.
    pub fn force_harvest_trigger_once(&mut self, force_harvest_trigger_once: bool) -> &mut Self {
        self.force_harvest_trigger_once = force_harvest_trigger_once;
        self
    }

    /// Sets the last tend timestamp.
    pub fn last_tend(&mut self, last_tend: u64) -> &mut Self {
        self.last_tend = Some(last_tend);
        self
    }
}
