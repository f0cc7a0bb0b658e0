use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// Lowest callable number.
pub const MIN_NUMBER: u8 = 1;
/// Highest callable number (one per ticket cell).
pub const MAX_NUMBER: u8 = 25;

/// A single drawn number and who called it, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub number: u8,
    pub caller_id: Option<PlayerId>,
}

/// Returns `true` if `number` lies in the callable range.
pub fn is_callable(number: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&number)
}

/// Ordered, duplicate-free record of drawn numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLedger {
    records: Vec<CallRecord>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from an authoritative history. Later duplicates of a
    /// number are dropped; the first occurrence keeps its position.
    pub fn from_records<I: IntoIterator<Item = CallRecord>>(records: I) -> Self {
        let mut ledger = Self::new();
        for r in records {
            ledger.record(r.number, r.caller_id);
        }
        ledger
    }

    /// Append a call. Returns `false` (and changes nothing) if the number is
    /// already present.
    pub fn record(&mut self, number: u8, caller_id: Option<PlayerId>) -> bool {
        if self.contains(number) {
            return false;
        }
        self.records.push(CallRecord { number, caller_id });
        true
    }

    pub fn contains(&self, number: u8) -> bool {
        self.records.iter().any(|r| r.number == number)
    }

    /// Numbers in call order.
    pub fn called_numbers(&self) -> Vec<u8> {
        self.records.iter().map(|r| r.number).collect()
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&CallRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn caller_of(&self, number: u8) -> Option<PlayerId> {
        self.records
            .iter()
            .find(|r| r.number == number)
            .and_then(|r| r.caller_id)
    }

    /// Called by `player`.
    pub fn is_pick_of(&self, number: u8, player: PlayerId) -> bool {
        self.caller_of(number) == Some(player)
    }

    /// Called by someone other than `player`. Unattributed calls count for nobody.
    pub fn is_pick_against(&self, number: u8, player: PlayerId) -> bool {
        self.caller_of(number).is_some_and(|c| c != player)
    }

    /// Callable numbers not yet drawn, ascending.
    pub fn available_numbers(&self) -> Vec<u8> {
        (MIN_NUMBER..=MAX_NUMBER)
            .filter(|n| !self.contains(*n))
            .collect()
    }

    /// Pick uniformly among the numbers not yet drawn. `None` when exhausted.
    pub fn choose_available<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u8> {
        self.available_numbers().choose(rng).copied()
    }
}
