pub mod ledger;
pub mod player;
pub mod room;
pub mod ticket;
pub mod win;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use uuid::Uuid;

    use crate::ledger::{CallLedger, CallRecord};
    use crate::player::PlayerEntry;
    use crate::room::{RoomSnapshot, RoomStatus};
    use crate::ticket::Ticket;

    /// Rows `[[1..=5], [6..=10], ...]` as a raw payload.
    pub fn sequential_rows() -> Vec<Vec<i64>> {
        (0..5)
            .map(|r| (1..=5).map(|c| r * 5 + c).collect())
            .collect()
    }

    /// Ticket whose row `r` holds `5r+1 ..= 5r+5`.
    pub fn sequential_ticket() -> Ticket {
        Ticket::from_rows(&sequential_rows()).expect("sequential grid is valid")
    }

    /// Unattributed records for the given numbers, in order.
    pub fn records(numbers: &[u8]) -> Vec<CallRecord> {
        numbers
            .iter()
            .map(|n| CallRecord {
                number: *n,
                caller_id: None,
            })
            .collect()
    }

    pub fn ledger_of(numbers: &[u8]) -> CallLedger {
        CallLedger::from_records(records(numbers))
    }

    /// Create `n` listed players with fresh ids.
    pub fn make_players(n: usize) -> Vec<PlayerEntry> {
        (0..n)
            .map(|i| PlayerEntry {
                player_id: Uuid::new_v4(),
                user_name: Some(format!("Player{}", i + 1)),
            })
            .collect()
    }

    pub fn active_room(turn: Uuid) -> RoomSnapshot {
        RoomSnapshot {
            status: RoomStatus::Active,
            current_turn_player_id: Some(turn),
            player_count: 2,
        }
    }
}
