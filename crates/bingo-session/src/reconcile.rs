//! Pure merge rules between optimistic local state and authority snapshots.

use bingo_core::ledger::{CallLedger, CallRecord};
use bingo_core::player::{PlayerEntry, PlayerId};

/// Ledger after a merge, plus the optimistic call still awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedHistory {
    pub ledger: CallLedger,
    pub pending: Option<CallRecord>,
}

/// Replace the ledger wholesale with the remote history. A locally accepted
/// call the remote does not list yet is carried on the end until a later
/// history contains it.
pub fn merge_history(remote: &[CallRecord], pending: Option<CallRecord>) -> MergedHistory {
    let mut ledger = CallLedger::from_records(remote.iter().copied());
    let pending = pending.filter(|p| !ledger.contains(p.number));
    if let Some(p) = pending {
        ledger.record(p.number, p.caller_id);
    }
    MergedHistory { ledger, pending }
}

/// First listed player other than `me`.
pub fn handoff_target(players: &[PlayerEntry], me: PlayerId) -> Option<PlayerId> {
    players
        .iter()
        .map(|p| p.player_id)
        .find(|id| *id != me)
}
