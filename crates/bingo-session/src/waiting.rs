use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use bingo_core::player::{RoomId, SessionIdentity};
use bingo_core::room::RoomSnapshot;

use crate::authority::{RoomAuthority, with_timeout};
use crate::config::SessionConfig;
use crate::error::SessionError;

/// Poll the room until it is active with both seats taken, then prepare the
/// first game. Poll failures are retried on the next interval.
pub async fn wait_for_opponent<A: RoomAuthority>(
    api: &A,
    identity: &SessionIdentity,
    config: &SessionConfig,
    cancel: &CancellationToken,
) -> Result<RoomSnapshot, SessionError> {
    let timeout = config.request_timeout();
    let mut poll = tokio::time::interval(config.rematch_poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(room = %identity.room_id, "Waiting for an opponent");
    let room = loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            _ = poll.tick() => {
                match with_timeout(timeout, api.get_room(identity.room_id)).await {
                    Ok(room) if room.is_ready() => break room,
                    Ok(room) => tracing::debug!(
                        room = %identity.room_id,
                        players = room.player_count,
                        "Room not ready"
                    ),
                    Err(e) => tracing::warn!(room = %identity.room_id, error = %e, "Waiting room poll failed"),
                }
            },
        }
    };

    start_game(api, identity, config, &room).await;
    Ok(room)
}

/// Set up the next game after a restart: fresh ticket, and a first turn if
/// the restart left the room without one.
pub async fn prepare_rematch<A: RoomAuthority>(
    api: &A,
    identity: &SessionIdentity,
    config: &SessionConfig,
) {
    let room_id = identity.room_id;
    match with_timeout(config.request_timeout(), api.get_room(room_id)).await {
        Ok(room) => start_game(api, identity, config, &room).await,
        Err(e) => {
            // Turn state unknown, so only the ticket is refreshed
            tracing::warn!(room = %room_id, error = %e, "Room lookup before rematch failed");
            generate_ticket(api, identity, config.request_timeout()).await;
        },
    }
}

/// Generate our ticket and, if nobody holds the turn yet, give it to the
/// first listed player. Failures are logged and the game is entered anyway.
pub async fn start_game<A: RoomAuthority>(
    api: &A,
    identity: &SessionIdentity,
    config: &SessionConfig,
    room: &RoomSnapshot,
) {
    let timeout = config.request_timeout();
    generate_ticket(api, identity, timeout).await;
    if room.current_turn_player_id.is_none() {
        assign_first_turn(api, identity.room_id, timeout).await;
    }
}

async fn generate_ticket<A: RoomAuthority>(
    api: &A,
    identity: &SessionIdentity,
    timeout: Duration,
) {
    let room_id = identity.room_id;
    if let Err(e) = with_timeout(timeout, api.generate_ticket(identity.player_id, room_id)).await {
        tracing::warn!(room = %room_id, error = %e, "Ticket generation failed");
    }
}

async fn assign_first_turn<A: RoomAuthority>(api: &A, room_id: RoomId, timeout: Duration) {
    let first = match with_timeout(timeout, api.list_players(room_id)).await {
        Ok(players) => players.first().map(|p| p.player_id),
        Err(e) => {
            tracing::warn!(room = %room_id, error = %e, "Player lookup failed");
            return;
        },
    };
    let Some(first) = first else {
        tracing::warn!(room = %room_id, "Room lists no players");
        return;
    };
    match with_timeout(timeout, api.set_turn(room_id, first)).await {
        Ok(()) => tracing::info!(room = %room_id, first = %first, "First turn assigned"),
        Err(e) => tracing::warn!(room = %room_id, error = %e, "Initial turn assignment failed"),
    }
}
