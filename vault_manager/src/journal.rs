//! Journal of everything the protocol does.
//!
//! Each transaction or keeper job opens a `JournalCollection`, appends notes while it runs
//! and is closed into the `Journal`, whether it succeeded or not.

use std::collections::VecDeque;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    constants::JOURNAL_CAPACITY,
    utils::error::{VaultError, VaultResult},
};

/// Log type of a journal entry
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum LogType {
    Info,
    /// Final result of a transaction or keeper attempt
    ExecutionResult,
    Harvest,
    Report,
    HealthCheck,
    Migration,
    EmergencyExit,
    Deposit,
    Withdrawal,
    Keeper,
}

/// Journal entry
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct JournalEntry {
    pub timestamp: u64,
    pub entry: VaultResult<()>,
    pub log_type: LogType,
    pub note: Option<String>,
}

/// A group of entries produced by one transaction or job
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct JournalCollection {
    pub start_date_and_time: u64,
    pub end_date_and_time: u64,
    pub caller: Option<Address>,
    pub strategy: Option<Address>,
    pub entries: Vec<JournalEntry>,
}

impl JournalCollection {
    /// Opens a new collection at `now`
    pub fn open(now: u64, strategy: Option<Address>) -> Self {
        Self {
            start_date_and_time: now,
            end_date_and_time: now,
            caller: None,
            strategy,
            entries: vec![],
        }
    }

    /// Fills the `caller` field of the collection
    pub fn caller(&mut self, caller: Address) -> &mut Self {
        self.caller = Some(caller);
        self
    }

    /// Appends a note stamped with the collection's opening time
    pub fn append_note<S: AsRef<str>>(
        &mut self,
        entry: VaultResult<()>,
        log_type: LogType,
        note: S,
    ) -> &mut Self {
        self.entries.push(JournalEntry {
            timestamp: self.start_date_and_time,
            entry,
            log_type,
            note: Some(note.as_ref().to_string()),
        });
        self
    }

    /// Returns `true` if any entry in the collection carries an error
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|entry| entry.entry.is_err())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bounded store of closed collections, oldest first
#[derive(Clone, Debug, Default)]
pub struct Journal {
    collections: VecDeque<JournalCollection>,
}

impl Journal {
    /// Closes `collection` at `now` and stores it, pruning the oldest ones beyond capacity.
    pub fn commit(&mut self, mut collection: JournalCollection, now: u64) {
        if collection.is_empty() {
            return;
        }
        collection.end_date_and_time = now;
        self.collections.push_back(collection);
        while self.collections.len() > JOURNAL_CAPACITY {
            self.collections.pop_front();
        }
    }

    pub fn collections(&self) -> impl Iterator<Item = &JournalCollection> {
        self.collections.iter()
    }

    pub fn latest(&self) -> Option<&JournalCollection> {
        self.collections.back()
    }

    /// All entries of the given type, oldest first
    pub fn entries_of(&self, log_type: LogType) -> Vec<&JournalEntry> {
        self.collections
            .iter()
            .flat_map(|collection| collection.entries.iter())
            .filter(|entry| entry.log_type == log_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Exports the journal as a JSON array
    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string(&self.collections)
            .map_err(|err| VaultError::DecodingError(err.to_string()))
    }
}
