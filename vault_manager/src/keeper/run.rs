use alloy_primitives::Address;

use super::{Keeper, KeeperOutcome};
use crate::{
    constants::MAX_RETRY_ATTEMPTS,
    journal::{JournalCollection, LogType},
    state::Protocol,
    utils::error::VaultResult,
};

impl Keeper {
    /// Visits every strategy in the withdrawal queue once.
    pub fn run_cycle(&mut self, protocol: &mut Protocol) -> Vec<(Address, KeeperOutcome)> {
        let queue = protocol.vault().withdrawal_queue().to_vec();
        queue
            .into_iter()
            .map(|strategy| (strategy, self.run_strategy(protocol, strategy)))
            .collect()
    }

    /// Runs one job on `strategy` under its lock.
    pub fn run_strategy(&mut self, protocol: &mut Protocol, strategy: Address) -> KeeperOutcome {
        let now = protocol.now();
        if self.lock_mut(strategy).try_lock(now).is_err() {
            return KeeperOutcome::Locked;
        }

        let mut journal = JournalCollection::open(now, Some(strategy));
        journal.caller(self.identity);

        let outcome = match self.job(protocol, strategy, &mut journal) {
            Ok(outcome) => outcome,
            Err(err) => KeeperOutcome::Failed(err),
        };

        let released_at = protocol.now();
        self.lock_mut(strategy).unlock(true, released_at);

        let result = match &outcome {
            KeeperOutcome::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        };
        journal.append_note(result, LogType::Keeper, format!("Keeper job finished: {:?}.", outcome));
        protocol.commit_journal(journal);
        outcome
    }

    fn job(
        &self,
        protocol: &mut Protocol,
        strategy: Address,
        journal: &mut JournalCollection,
    ) -> VaultResult<KeeperOutcome> {
        if let Some(reason) = protocol.harvest_trigger(strategy, self.call_cost)? {
            for turn in 0..=MAX_RETRY_ATTEMPTS {
                match protocol.harvest(self.identity, strategy) {
                    Ok(_) => return Ok(KeeperOutcome::Harvested(reason)),
                    Err(err) if err.is_retriable() && turn < MAX_RETRY_ATTEMPTS => {
                        journal.append_note(
                            Err(err),
                            LogType::Keeper,
                            format!(
                                "Harvest attempt {}/{} failed, retrying.",
                                turn + 1,
                                MAX_RETRY_ATTEMPTS + 1
                            ),
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        if protocol.tend_trigger(strategy, self.call_cost)? {
            protocol.tend(self.identity, strategy)?;
            return Ok(KeeperOutcome::Tended);
        }

        Ok(KeeperOutcome::Skipped)
    }
}
