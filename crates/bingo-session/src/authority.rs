use std::future::Future;
use std::time::Duration;

use bingo_core::ledger::CallRecord;
use bingo_core::player::{PlayerEntry, PlayerId, RoomId};
use bingo_core::room::RoomSnapshot;
use bingo_core::win::WinnerReport;

/// Failure talking to the room authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection-level failure.
    Transport(String),
    /// No answer within the request timeout.
    Timeout,
    /// Non-success HTTP-like status.
    Status(u16),
    NotFound,
    /// The number was already drawn.
    Conflict,
    /// Response could not be understood.
    Decode(String),
}

impl RemoteError {
    /// Failures worth trying again on the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status(code) => *code >= 500,
            Self::NotFound | Self::Conflict | Self::Decode(_) => false,
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Status(code) => write!(f, "authority returned status {code}"),
            Self::NotFound => write!(f, "not found"),
            Self::Conflict => write!(f, "number already drawn"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Bound a single request. Elapsed time maps to `RemoteError::Timeout`.
pub async fn with_timeout<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    tokio::time::timeout(limit, request)
        .await
        .unwrap_or(Err(RemoteError::Timeout))
}

/// Raw ticket grid as delivered by the authority; validated by `Ticket::from_rows`.
pub type TicketRows = Vec<Vec<i64>>;

/// The remote game-room authority. Every method is a single request; callers
/// impose their own timeout.
pub trait RoomAuthority {
    fn get_room(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<RoomSnapshot, RemoteError>> + Send;

    fn get_draw_history(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<Vec<CallRecord>, RemoteError>> + Send;

    /// `Err(RemoteError::Conflict)` when the number was already drawn.
    fn submit_call(
        &self,
        room: RoomId,
        player: PlayerId,
        number: u8,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn set_turn(
        &self,
        room: RoomId,
        player: PlayerId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn list_players(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<Vec<PlayerEntry>, RemoteError>> + Send;

    /// Ask the authority to evaluate tickets and declare a winner.
    fn check_winner(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<WinnerReport, RemoteError>> + Send;

    /// Read the declared winner without triggering evaluation.
    fn get_winner(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<WinnerReport, RemoteError>> + Send;

    fn restart_game(&self, room: RoomId) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// `Err(RemoteError::NotFound)` when no ticket exists yet.
    fn get_ticket(
        &self,
        player: PlayerId,
    ) -> impl Future<Output = Result<TicketRows, RemoteError>> + Send;

    fn generate_ticket(
        &self,
        player: PlayerId,
        room: RoomId,
    ) -> impl Future<Output = Result<TicketRows, RemoteError>> + Send;
}
