#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use bingo_core::ledger::CallRecord;
use bingo_core::player::{PlayerEntry, PlayerId, RoomId, SessionIdentity};
use bingo_core::room::{RoomSnapshot, RoomStatus};
use bingo_core::test_helpers::sequential_rows;
use bingo_core::win::WinnerReport;
use bingo_session::authority::{RemoteError, RoomAuthority, TicketRows};
use bingo_session::config::SessionConfig;
use bingo_session::session::SessionEvent;

/// Requests seen by the fake, in the order they arrived.
#[derive(Debug, Default)]
pub struct Calls {
    pub get_room: usize,
    pub get_draw_history: usize,
    pub submitted: Vec<u8>,
    pub set_turn: Vec<PlayerId>,
    pub list_players: usize,
    pub check_winner: usize,
    pub get_winner: usize,
    pub restart: usize,
    pub get_ticket: usize,
    pub generate_ticket: usize,
}

#[derive(Debug)]
pub struct FakeRoom {
    pub room: RoomSnapshot,
    pub players: Vec<PlayerEntry>,
    pub draws: Vec<CallRecord>,
    pub tickets: HashMap<PlayerId, TicketRows>,
    pub check_winner_answer: WinnerReport,
    pub winner: WinnerReport,
    /// Number of upcoming `set_turn` requests to fail.
    pub fail_set_turn: usize,
    pub fail_list_players: usize,
    pub fail_restart: usize,
    /// Number of upcoming `check_winner` requests to time out.
    pub fail_check_winner: usize,
    /// Fail every `get_room` with a transport error.
    pub room_unreachable: bool,
    pub calls: Calls,
}

/// In-memory room authority shared between a test and the code under test.
#[derive(Debug, Clone)]
pub struct FakeAuthority {
    inner: Arc<Mutex<FakeRoom>>,
}

impl FakeAuthority {
    pub fn new(room: RoomSnapshot, players: Vec<PlayerEntry>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeRoom {
                room,
                players,
                draws: Vec::new(),
                tickets: HashMap::new(),
                check_winner_answer: WinnerReport::default(),
                winner: WinnerReport::default(),
                fail_set_turn: 0,
                fail_list_players: 0,
                fail_restart: 0,
                fail_check_winner: 0,
                room_unreachable: false,
                calls: Calls::default(),
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeRoom> {
        self.inner.lock().unwrap()
    }
}

fn take_failure(counter: &mut usize) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

impl RoomAuthority for FakeAuthority {
    async fn get_room(&self, _room: RoomId) -> Result<RoomSnapshot, RemoteError> {
        let mut s = self.state();
        s.calls.get_room += 1;
        if s.room_unreachable {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(s.room.clone())
    }

    async fn get_draw_history(&self, _room: RoomId) -> Result<Vec<CallRecord>, RemoteError> {
        let mut s = self.state();
        s.calls.get_draw_history += 1;
        Ok(s.draws.clone())
    }

    async fn submit_call(
        &self,
        _room: RoomId,
        player: PlayerId,
        number: u8,
    ) -> Result<(), RemoteError> {
        let mut s = self.state();
        s.calls.submitted.push(number);
        if s.draws.iter().any(|r| r.number == number) {
            return Err(RemoteError::Conflict);
        }
        s.draws.push(CallRecord {
            number,
            caller_id: Some(player),
        });
        Ok(())
    }

    async fn set_turn(&self, _room: RoomId, player: PlayerId) -> Result<(), RemoteError> {
        let mut s = self.state();
        s.calls.set_turn.push(player);
        if take_failure(&mut s.fail_set_turn) {
            return Err(RemoteError::Status(500));
        }
        s.room.current_turn_player_id = Some(player);
        Ok(())
    }

    async fn list_players(&self, _room: RoomId) -> Result<Vec<PlayerEntry>, RemoteError> {
        let mut s = self.state();
        s.calls.list_players += 1;
        if take_failure(&mut s.fail_list_players) {
            return Err(RemoteError::Timeout);
        }
        Ok(s.players.clone())
    }

    async fn check_winner(&self, _room: RoomId) -> Result<WinnerReport, RemoteError> {
        let mut s = self.state();
        s.calls.check_winner += 1;
        if take_failure(&mut s.fail_check_winner) {
            return Err(RemoteError::Timeout);
        }
        let answer = s.check_winner_answer.clone();
        if answer.winner {
            s.room.status = RoomStatus::Completed;
            s.winner = answer.clone();
        }
        Ok(answer)
    }

    async fn get_winner(&self, _room: RoomId) -> Result<WinnerReport, RemoteError> {
        let mut s = self.state();
        s.calls.get_winner += 1;
        Ok(s.winner.clone())
    }

    async fn restart_game(&self, _room: RoomId) -> Result<(), RemoteError> {
        let mut s = self.state();
        s.calls.restart += 1;
        if take_failure(&mut s.fail_restart) {
            return Err(RemoteError::Status(503));
        }
        s.room.status = RoomStatus::Active;
        s.draws.clear();
        s.winner = WinnerReport::default();
        Ok(())
    }

    async fn get_ticket(&self, player: PlayerId) -> Result<TicketRows, RemoteError> {
        let mut s = self.state();
        s.calls.get_ticket += 1;
        s.tickets.get(&player).cloned().ok_or(RemoteError::NotFound)
    }

    async fn generate_ticket(
        &self,
        player: PlayerId,
        _room: RoomId,
    ) -> Result<TicketRows, RemoteError> {
        let mut s = self.state();
        s.calls.generate_ticket += 1;
        let rows = sequential_rows();
        s.tickets.insert(player, rows.clone());
        Ok(rows)
    }
}

/// Local player plus one opponent in an active room.
pub struct Table {
    pub me: SessionIdentity,
    pub opponent: PlayerId,
    pub api: FakeAuthority,
}

impl Table {
    /// Two players, turn held by `first`.
    pub fn two_players(first_is_me: bool) -> Self {
        let me = identity();
        let opponent = Uuid::new_v4();
        let turn = if first_is_me { me.player_id } else { opponent };
        let api = FakeAuthority::new(
            RoomSnapshot {
                status: RoomStatus::Active,
                current_turn_player_id: Some(turn),
                player_count: 2,
            },
            vec![
                PlayerEntry {
                    player_id: me.player_id,
                    user_name: Some(me.user_name.clone()),
                },
                PlayerEntry {
                    player_id: opponent,
                    user_name: Some("them".to_string()),
                },
            ],
        );
        api.state()
            .tickets
            .insert(me.player_id, sequential_rows());
        Self { me, opponent, api }
    }

    /// Only the local player is listed.
    pub fn alone() -> Self {
        let table = Self::two_players(true);
        table.api.state().players.truncate(1);
        table
    }
}

pub fn identity() -> SessionIdentity {
    SessionIdentity {
        player_id: Uuid::new_v4(),
        room_id: Uuid::new_v4(),
        user_name: "me".to_string(),
    }
}

pub fn config() -> SessionConfig {
    SessionConfig::default()
}

pub fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

pub fn count_timer_starts(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::TimerStarted(_)))
        .count()
}

/// Let the session task run for `ms` of virtual time.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
