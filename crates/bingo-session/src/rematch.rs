use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use bingo_core::player::RoomId;
use bingo_core::room::{RoomSnapshot, RoomStatus};

use crate::authority::{RoomAuthority, with_timeout};
use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchState {
    /// Polling the room for a restart by the other player.
    Watching,
    /// Our own restart request is outstanding.
    Requested,
    /// The room is active again; waiting for the player to accept.
    Available,
    Accepted,
    Closed,
}

/// Tracks whether a finished room can be played again.
#[derive(Debug, Clone)]
pub struct RematchCoordinator {
    room_id: RoomId,
    state: RematchState,
}

impl RematchCoordinator {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            state: RematchState::Watching,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn state(&self) -> RematchState {
        self.state
    }

    pub fn is_polling(&self) -> bool {
        self.state == RematchState::Watching
    }

    pub fn is_available(&self) -> bool {
        self.state == RematchState::Available
    }

    /// Returns `true` the first time the room is seen active again.
    pub fn apply_room(&mut self, room: &RoomSnapshot) -> bool {
        if self.state != RematchState::Watching || room.status != RoomStatus::Active {
            return false;
        }
        tracing::info!(room = %self.room_id, "Rematch available");
        self.state = RematchState::Available;
        true
    }

    /// Start our own restart request.
    pub fn request(&mut self) -> bool {
        match self.state {
            RematchState::Watching | RematchState::Available => {
                self.state = RematchState::Requested;
                true
            },
            _ => false,
        }
    }

    pub fn restart_succeeded(&mut self) {
        if self.state == RematchState::Requested {
            self.state = RematchState::Accepted;
        }
    }

    pub fn restart_failed(&mut self) {
        if self.state == RematchState::Requested {
            self.state = RematchState::Watching;
        }
    }

    /// Join a rematch the other player started.
    pub fn accept(&mut self) -> bool {
        if self.state != RematchState::Available {
            return false;
        }
        self.state = RematchState::Accepted;
        true
    }

    /// Idempotent.
    pub fn teardown(&mut self) {
        if self.state != RematchState::Accepted {
            self.state = RematchState::Closed;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchCommand {
    /// Ask the authority to restart the room.
    Restart,
    /// Join a restart requested by the other player.
    Accept,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RematchEvent {
    Available,
    RestartFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchOutcome {
    /// Start a new session in the same room.
    Rematch,
    Left,
    Cancelled,
}

/// Wait for a rematch after a finished game. Polls only while nothing has
/// been flagged yet.
pub async fn run_rematch<A: RoomAuthority>(
    api: &A,
    room_id: RoomId,
    config: &SessionConfig,
    cancel: CancellationToken,
    mut commands: mpsc::UnboundedReceiver<RematchCommand>,
    events: mpsc::UnboundedSender<RematchEvent>,
) -> RematchOutcome {
    let mut coordinator = RematchCoordinator::new(room_id);
    let timeout = config.request_timeout();
    let mut poll = tokio::time::interval(config.rematch_poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => break RematchOutcome::Cancelled,
            _ = poll.tick(), if coordinator.is_polling() => {
                match with_timeout(timeout, api.get_room(room_id)).await {
                    Ok(room) => {
                        if coordinator.apply_room(&room) {
                            let _ = events.send(RematchEvent::Available);
                        }
                    },
                    Err(e) => tracing::warn!(room = %room_id, error = %e, "Rematch poll failed"),
                }
            },
            cmd = commands.recv() => match cmd {
                Some(RematchCommand::Restart) => {
                    if !coordinator.request() {
                        continue;
                    }
                    match with_timeout(timeout, api.restart_game(room_id)).await {
                        Ok(()) => {
                            tracing::info!(room = %room_id, "Restart requested");
                            coordinator.restart_succeeded();
                            break RematchOutcome::Rematch;
                        },
                        Err(e) => {
                            tracing::warn!(room = %room_id, error = %e, "Restart failed");
                            coordinator.restart_failed();
                            let _ = events.send(RematchEvent::RestartFailed(e.to_string()));
                        },
                    }
                },
                Some(RematchCommand::Accept) => {
                    if coordinator.accept() {
                        break RematchOutcome::Rematch;
                    }
                },
                Some(RematchCommand::Leave) | None => break RematchOutcome::Left,
            },
        }
    };

    coordinator.teardown();
    outcome
}
