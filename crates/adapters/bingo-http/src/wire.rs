//! Backend JSON shapes. The backend is loose about casing and about whether
//! numbers arrive as numbers or strings, so decoding is tolerant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use bingo_core::ledger::{CallRecord, is_callable};
use bingo_core::player::{PlayerEntry, PlayerId, RoomId};
use bingo_core::room::{RoomSnapshot, RoomStatus};
use bingo_core::win::WinnerReport;
use bingo_session::authority::{RemoteError, TicketRows};

/// A number that may be sent as `7` or `"7"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseInt {
    Int(i64),
    Text(String),
}

impl LooseInt {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Parse an id that may be missing, empty or malformed.
fn loose_id(raw: Option<&str>) -> Option<Uuid> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Uuid::parse_str(s).ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    #[serde(alias = "Status")]
    pub status: String,
    #[serde(default, alias = "CurrentTurnPlayerId")]
    pub current_turn_player_id: Option<String>,
    #[serde(default, alias = "PlayerCount")]
    pub player_count: u32,
}

impl RoomDto {
    pub fn into_snapshot(self) -> Result<RoomSnapshot, RemoteError> {
        let status = match self.status.to_ascii_lowercase().as_str() {
            "active" => RoomStatus::Active,
            "completed" => RoomStatus::Completed,
            "pending" | "waiting" => RoomStatus::Pending,
            other => return Err(RemoteError::Decode(format!("unknown room status {other:?}"))),
        };
        Ok(RoomSnapshot {
            status,
            current_turn_player_id: loose_id(self.current_turn_player_id.as_deref()),
            player_count: self.player_count,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DrawEntryDto {
    Bare(LooseInt),
    Record {
        #[serde(alias = "Number")]
        number: LooseInt,
        #[serde(default, rename = "playerId", alias = "PlayerId")]
        player_id: Option<Value>,
    },
    /// Anything else; skipped so one bad entry does not sink the history.
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawHistoryDto {
    #[serde(default, alias = "DrawnNumbers")]
    pub drawn_numbers: Vec<DrawEntryDto>,
}

impl DrawHistoryDto {
    /// Entries that are not a callable number are dropped.
    pub fn into_records(self) -> Vec<CallRecord> {
        self.drawn_numbers
            .into_iter()
            .filter_map(|entry| {
                let (number, caller) = match entry {
                    DrawEntryDto::Bare(n) => (n, None),
                    DrawEntryDto::Record { number, player_id } => (number, player_id),
                    DrawEntryDto::Other(_) => {
                        tracing::debug!("Skipping unrecognised draw entry");
                        return None;
                    },
                };
                let number = number
                    .as_i64()
                    .and_then(|n| u8::try_from(n).ok())
                    .filter(|n| is_callable(*n));
                if number.is_none() {
                    tracing::debug!("Skipping unreadable draw entry");
                }
                Some(CallRecord {
                    number: number?,
                    caller_id: loose_id(caller.as_ref().and_then(Value::as_str)),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    #[serde(alias = "PlayerId")]
    pub player_id: String,
    #[serde(default, alias = "UserName", alias = "name")]
    pub user_name: Option<String>,
}

pub fn players_from(dtos: Vec<PlayerDto>) -> Vec<PlayerEntry> {
    dtos.into_iter()
        .filter_map(|p| {
            Some(PlayerEntry {
                player_id: loose_id(Some(p.player_id.as_str()))?,
                user_name: p.user_name,
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerDto {
    #[serde(default, alias = "Winner")]
    pub winner: bool,
    #[serde(default, alias = "PlayerId", alias = "winnerId")]
    pub player_id: Option<String>,
    #[serde(default, alias = "winnerName", alias = "PlayerName", alias = "WinnerName")]
    pub player_name: Option<String>,
    #[serde(default, alias = "IsDraw")]
    pub is_draw: Option<bool>,
}

impl From<WinnerDto> for WinnerReport {
    fn from(dto: WinnerDto) -> Self {
        Self {
            winner: dto.winner,
            player_id: loose_id(dto.player_id.as_deref()),
            player_name: dto.player_name,
            is_draw: dto.is_draw.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCallBody {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub number: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBody {
    pub room_id: RoomId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTicketBody {
    pub player_id: PlayerId,
    pub room_id: RoomId,
}

/// Decode a ticket given as an array of rows, a JSON string holding one, or
/// an object with a `numbers` field.
pub fn decode_ticket(value: Value) -> Result<TicketRows, RemoteError> {
    match value {
        Value::Array(rows) => rows.into_iter().map(decode_row).collect(),
        Value::String(text) => {
            let inner: Value = serde_json::from_str(&text)
                .map_err(|e| RemoteError::Decode(format!("ticket string: {e}")))?;
            match inner {
                Value::Array(_) => decode_ticket(inner),
                _ => Err(RemoteError::Decode("ticket string is not an array".to_string())),
            }
        },
        Value::Object(mut fields) => {
            let numbers = fields
                .remove("numbers")
                .or_else(|| fields.remove("Numbers"))
                .ok_or_else(|| RemoteError::Decode("ticket has no numbers".to_string()))?;
            decode_ticket(numbers)
        },
        other => Err(RemoteError::Decode(format!("unexpected ticket payload: {other}"))),
    }
}

fn decode_row(row: Value) -> Result<Vec<i64>, RemoteError> {
    match row {
        Value::Array(cells) => cells.into_iter().map(decode_cell).collect(),
        other => Err(RemoteError::Decode(format!("ticket row is not an array: {other}"))),
    }
}

fn decode_cell(cell: Value) -> Result<i64, RemoteError> {
    let parsed = match &cell {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| RemoteError::Decode(format!("ticket cell is not a number: {cell}")))
}
