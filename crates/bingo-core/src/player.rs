use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player, as issued by the room authority.
pub type PlayerId = Uuid;

/// Unique identifier for a game room.
pub type RoomId = Uuid;

/// A participant listed in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub player_id: PlayerId,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Session storage keys shared with the screens around the game core.
pub mod keys {
    pub const PLAYER_ID: &str = "playerId";
    pub const ROOM_ID: &str = "roomId";
    pub const USER_NAME: &str = "userName";
    pub const WINNER_ID: &str = "winnerId";
    pub const WINNER_NAME: &str = "winnerName";
    pub const IS_DRAW: &str = "isDraw";
}

/// Why a session identity could not be assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "session value '{key}' is missing"),
            Self::Invalid { key, value } => {
                write!(f, "session value '{key}' is not a valid id: {value:?}")
            },
        }
    }
}

impl std::error::Error for IdentityError {}

/// Who is playing, and where. Required before a session may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub player_id: PlayerId,
    pub room_id: RoomId,
    pub user_name: String,
}

impl SessionIdentity {
    /// Build an identity from session-storage style key/value pairs.
    ///
    /// A missing or empty `playerId`/`roomId` is fatal: the game core must not
    /// run without them. `userName` is optional.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Result<Self, IdentityError> {
        let player_id = required_id(pairs, keys::PLAYER_ID)?;
        let room_id = required_id(pairs, keys::ROOM_ID)?;
        let user_name = pairs.get(keys::USER_NAME).cloned().unwrap_or_default();
        Ok(Self {
            player_id,
            room_id,
            user_name,
        })
    }

    pub fn to_pairs(&self) -> HashMap<String, String> {
        let mut pairs = HashMap::new();
        pairs.insert(keys::PLAYER_ID.to_string(), self.player_id.to_string());
        pairs.insert(keys::ROOM_ID.to_string(), self.room_id.to_string());
        pairs.insert(keys::USER_NAME.to_string(), self.user_name.clone());
        pairs
    }
}

fn required_id(
    pairs: &HashMap<String, String>,
    key: &'static str,
) -> Result<Uuid, IdentityError> {
    let raw = pairs
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(IdentityError::Missing(key))?;
    Uuid::parse_str(raw).map_err(|_| IdentityError::Invalid {
        key,
        value: raw.to_string(),
    })
}

/// Winner details kept for the result screen after a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerSnapshot {
    pub winner_id: PlayerId,
    pub winner_name: String,
    pub is_draw: bool,
}

impl WinnerSnapshot {
    pub fn write_pairs(&self, pairs: &mut HashMap<String, String>) {
        pairs.insert(keys::WINNER_ID.to_string(), self.winner_id.to_string());
        pairs.insert(keys::WINNER_NAME.to_string(), self.winner_name.clone());
        pairs.insert(keys::IS_DRAW.to_string(), self.is_draw.to_string());
    }

    /// Read a snapshot back. Both id and name must be present.
    pub fn read_pairs(pairs: &HashMap<String, String>) -> Option<Self> {
        let winner_id = Uuid::parse_str(pairs.get(keys::WINNER_ID)?).ok()?;
        let winner_name = pairs.get(keys::WINNER_NAME)?.clone();
        let is_draw = pairs.get(keys::IS_DRAW).is_some_and(|v| v == "true");
        Some(Self {
            winner_id,
            winner_name,
            is_draw,
        })
    }

    /// Remove the snapshot keys (win acknowledged or lobby return).
    pub fn clear_pairs(pairs: &mut HashMap<String, String>) {
        pairs.remove(keys::WINNER_ID);
        pairs.remove(keys::WINNER_NAME);
        pairs.remove(keys::IS_DRAW);
    }
}
