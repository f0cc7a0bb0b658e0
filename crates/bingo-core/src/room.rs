use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// Status of a room as reported by the authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Waiting for the second player.
    #[default]
    Pending,
    Active,
    Completed,
}

/// Point-in-time view of a room returned by `GetRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub status: RoomStatus,
    #[serde(default)]
    pub current_turn_player_id: Option<PlayerId>,
    #[serde(default)]
    pub player_count: u32,
}

impl RoomSnapshot {
    /// Both seats are taken and the game is live.
    pub fn is_ready(&self) -> bool {
        self.status == RoomStatus::Active && self.player_count >= 2
    }
}

/// Turn ownership as last confirmed by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub current_turn_player_id: Option<PlayerId>,
    pub local_player_id: PlayerId,
    pub game_status: RoomStatus,
}

impl TurnState {
    pub fn new(local_player_id: PlayerId) -> Self {
        Self {
            current_turn_player_id: None,
            local_player_id,
            game_status: RoomStatus::Pending,
        }
    }

    pub fn is_my_turn(&self) -> bool {
        self.current_turn_player_id == Some(self.local_player_id)
    }

    pub fn apply(&mut self, room: &RoomSnapshot) {
        self.current_turn_player_id = room.current_turn_player_id;
        self.game_status = room.status;
    }
}
