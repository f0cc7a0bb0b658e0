use rand::SeedableRng;
use rand::rngs::StdRng;

use bingo_core::ledger::{CallLedger, CallRecord, MAX_NUMBER, MIN_NUMBER, is_callable};
use bingo_core::player::{PlayerEntry, PlayerId, RoomId, SessionIdentity};
use bingo_core::room::{RoomSnapshot, RoomStatus, TurnState};
use bingo_core::ticket::{MarkOutcome, Ticket, TicketError};
use bingo_core::win::{BingoProgress, WinDetector, WinResult, WinSignal, WinnerReport};

use crate::reconcile::{handoff_target, merge_history};
use crate::timer::{TimerTick, TurnTimer};

/// Who holds the turn while the game is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOwner {
    Mine,
    Opponent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conclusion {
    /// Room reported completed; winner not known yet.
    AwaitingWinner,
    Decided(WinResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Active(TurnOwner),
    Completed(Conclusion),
}

/// Progress of the local player's turn action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnAction {
    Idle,
    Submitting(u8),
    HandingOff(u8),
    /// Call went through but the turn transfer failed; retried on the next poll.
    HandoffPending,
}

/// Where our own win claim stands after the authority answered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WinClaim {
    Settled,
    /// The check request failed; claim again on the next poll.
    Retry,
    /// The authority saw no winner; claim again once the ledger grows.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOrigin {
    Manual,
    Timer,
}

/// Why a call was refused before reaching the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRejected {
    OutOfRange(u8),
    AlreadyCalled(u8),
    GameNotActive,
    NotYourTurn,
    InFlight,
    HandoffPending,
}

impl std::fmt::Display for CallRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange(n) => {
                write!(f, "{n} is not between {MIN_NUMBER} and {MAX_NUMBER}")
            },
            Self::AlreadyCalled(n) => write!(f, "{n} has already been called"),
            Self::GameNotActive => write!(f, "game is not active"),
            Self::NotYourTurn => write!(f, "it is not your turn"),
            Self::InFlight => write!(f, "a call is already being submitted"),
            Self::HandoffPending => write!(f, "waiting to hand the turn over"),
        }
    }
}

impl std::error::Error for CallRejected {}

/// Remote actions whose failure is shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    LoadTicket,
    Call,
    Handoff,
    WinCheck,
}

/// How a turn transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffResult {
    Passed(PlayerId),
    /// Nobody else in the room; the turn stays local.
    NoOpponent,
    Failed,
}

/// Outcome of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Idle,
    Counting(u32),
    /// Countdown ran out; submit this number as a timer call.
    AutoPick(u8),
    /// Countdown ran out with nothing left to call.
    Exhausted,
}

/// Notifications for whatever renders the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    TicketLoaded(Ticket),
    NumberCalled(CallRecord),
    ProgressChanged(BingoProgress),
    TimerStarted(u32),
    TimerTick(u32),
    TimerStopped,
    AutoPicked(u8),
    CallRejected(CallRejected),
    ActionFailed {
        action: SessionAction,
        message: String,
    },
    /// Local ticket is full; confirmation requested from the authority.
    WinClaimed,
    WinConfirmed(WinResult),
}

/// Single-owner session state: ticket, ledger, turn ownership, timer and win
/// detection, reconciled against authority snapshots.
pub struct Session {
    identity: SessionIdentity,
    turn: TurnState,
    phase: SessionPhase,
    action: TurnAction,
    ledger: CallLedger,
    pending: Option<CallRecord>,
    ticket: Option<Ticket>,
    detector: WinDetector,
    claim: WinClaim,
    timer: TurnTimer,
    rng: StdRng,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(identity: SessionIdentity, turn_ticks: u32) -> Self {
        Self::with_rng(identity, turn_ticks, StdRng::from_os_rng())
    }

    pub fn with_seed(identity: SessionIdentity, turn_ticks: u32, seed: u64) -> Self {
        Self::with_rng(identity, turn_ticks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(identity: SessionIdentity, turn_ticks: u32, rng: StdRng) -> Self {
        Self {
            turn: TurnState::new(identity.player_id),
            identity,
            phase: SessionPhase::Loading,
            action: TurnAction::Idle,
            ledger: CallLedger::new(),
            pending: None,
            ticket: None,
            detector: WinDetector::new(),
            claim: WinClaim::Settled,
            timer: TurnTimer::new(turn_ticks),
            rng,
            events: Vec::new(),
        }
    }

    // --- queries ---

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn player_id(&self) -> PlayerId {
        self.identity.player_id
    }

    pub fn room_id(&self) -> RoomId {
        self.identity.room_id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn ledger(&self) -> &CallLedger {
        &self.ledger
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    pub fn progress(&self) -> BingoProgress {
        self.detector.progress()
    }

    pub fn completed_rows(&self) -> &[usize] {
        &self.detector.lines().rows
    }

    pub fn completed_columns(&self) -> &[usize] {
        &self.detector.lines().columns
    }

    pub fn completed_lines(&self) -> usize {
        self.detector.completed_lines()
    }

    pub fn timer_remaining(&self) -> Option<u32> {
        self.timer.remaining()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn is_my_turn(&self) -> bool {
        self.phase == SessionPhase::Active(TurnOwner::Mine)
    }

    pub fn call_in_flight(&self) -> bool {
        matches!(
            self.action,
            TurnAction::Submitting(_) | TurnAction::HandingOff(_)
        )
    }

    pub fn handoff_pending(&self) -> bool {
        self.action == TurnAction::HandoffPending
    }

    /// Whether the room/draw poll should still run.
    pub fn polls_turn_and_draws(&self) -> bool {
        !matches!(self.phase, SessionPhase::Completed(_))
    }

    pub fn is_concluded(&self) -> bool {
        matches!(self.phase, SessionPhase::Completed(Conclusion::Decided(_)))
    }

    pub fn result(&self) -> Option<&WinResult> {
        match &self.phase {
            SessionPhase::Completed(Conclusion::Decided(r)) => Some(r),
            _ => None,
        }
    }

    pub fn is_my_pick(&self, number: u8) -> bool {
        self.ledger.is_pick_of(number, self.identity.player_id)
    }

    pub fn is_opponent_pick(&self, number: u8) -> bool {
        self.ledger.is_pick_against(number, self.identity.player_id)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // --- ticket ---

    /// Install a ticket from a raw payload. A malformed payload leaves the
    /// current ticket untouched.
    pub fn load_ticket(&mut self, rows: &[Vec<i64>]) -> Result<Option<WinSignal>, TicketError> {
        let ticket = Ticket::from_rows(rows)?;
        self.events.push(SessionEvent::TicketLoaded(ticket.clone()));
        self.ticket = Some(ticket);
        tracing::info!(room = %self.identity.room_id, "Ticket loaded");
        Ok(self.remark())
    }

    /// Manual mark of an already-called cell.
    pub fn toggle_mark(&mut self, row: usize, col: usize) -> (MarkOutcome, Option<WinSignal>) {
        let Some(ticket) = self.ticket.as_mut() else {
            return (MarkOutcome::NoTicket, None);
        };
        let outcome = ticket.toggle_mark(row, col, &self.ledger);
        if outcome != MarkOutcome::Marked {
            return (outcome, None);
        }
        (outcome, self.evaluate())
    }

    fn remark(&mut self) -> Option<WinSignal> {
        let ticket = self.ticket.as_mut()?;
        ticket.auto_mark(&self.ledger);
        self.evaluate()
    }

    fn evaluate(&mut self) -> Option<WinSignal> {
        let ticket = self.ticket.as_ref()?;
        let before = self.detector.progress();
        let signal = self.detector.observe(ticket);
        let after = self.detector.progress();
        if after != before {
            self.events.push(SessionEvent::ProgressChanged(after));
        }
        if signal.is_some() {
            tracing::info!(
                room = %self.identity.room_id,
                lines = self.detector.completed_lines(),
                "Full card, requesting win confirmation"
            );
            self.events.push(SessionEvent::WinClaimed);
        }
        signal
    }

    // --- authority snapshots ---

    /// Apply a polled room snapshot. Returns `true` when the session should
    /// retry a pending turn handoff now.
    pub fn apply_room(&mut self, room: &RoomSnapshot) -> bool {
        if !self.polls_turn_and_draws() {
            return false;
        }
        self.turn.apply(room);

        let phase = match room.status {
            RoomStatus::Pending => SessionPhase::Loading,
            RoomStatus::Completed => SessionPhase::Completed(Conclusion::AwaitingWinner),
            RoomStatus::Active if self.turn.is_my_turn() => SessionPhase::Active(TurnOwner::Mine),
            RoomStatus::Active => SessionPhase::Active(TurnOwner::Opponent),
        };
        if phase == SessionPhase::Completed(Conclusion::AwaitingWinner) {
            tracing::info!(room = %self.identity.room_id, "Room completed, stopping turn polling");
            self.action = TurnAction::Idle;
        }
        if phase == SessionPhase::Active(TurnOwner::Opponent)
            && self.action == TurnAction::HandoffPending
        {
            self.action = TurnAction::Idle;
        }
        self.set_phase(phase);
        self.sync_timer();

        self.is_my_turn() && self.action == TurnAction::HandoffPending
    }

    /// Apply a polled draw history. The remote list replaces the ledger,
    /// keeping an optimistic call the remote has not caught up with.
    pub fn apply_history(&mut self, remote: &[CallRecord]) -> Option<WinSignal> {
        if !self.polls_turn_and_draws() {
            return None;
        }
        let merged = merge_history(remote, self.pending);
        let mut grew = false;
        for record in merged.ledger.records() {
            if !self.ledger.contains(record.number) {
                grew = true;
                self.events.push(SessionEvent::NumberCalled(*record));
            }
        }
        self.ledger = merged.ledger;
        self.pending = merged.pending;
        let signal = self.remark();
        if signal.is_some() {
            return signal;
        }
        self.reclaim(grew)
    }

    /// Apply a `CheckWinner`/`GetWinner` answer. Returns the result once decided.
    pub fn apply_winner(&mut self, report: WinnerReport) -> Option<WinResult> {
        if self.is_concluded() {
            return self.result().cloned();
        }
        let Some(result) = report.into_result() else {
            tracing::warn!(room = %self.identity.room_id, "Authority reports no winner yet");
            if self.detector.has_signalled() && self.claim == WinClaim::Settled {
                self.claim = WinClaim::Rejected;
            }
            return None;
        };
        tracing::info!(
            room = %self.identity.room_id,
            winner = %result.winner_id,
            draw = result.is_draw,
            "Winner confirmed"
        );
        self.action = TurnAction::Idle;
        self.set_phase(SessionPhase::Completed(Conclusion::Decided(result.clone())));
        self.sync_timer();
        self.events.push(SessionEvent::WinConfirmed(result.clone()));
        Some(result)
    }

    // --- calls ---

    /// Validate and reserve a call. On success the in-flight guard is set and
    /// the caller must report back with `call_accepted` or `call_failed`.
    pub fn begin_call(&mut self, number: u8, origin: CallOrigin) -> Result<u8, CallRejected> {
        let checked = self.check_call(number);
        if let Err(reason) = checked {
            tracing::debug!(number, ?origin, %reason, "Call rejected");
            self.events.push(SessionEvent::CallRejected(reason));
            return Err(reason);
        }
        self.action = TurnAction::Submitting(number);
        self.sync_timer();
        tracing::debug!(number, ?origin, "Submitting call");
        Ok(number)
    }

    fn check_call(&self, number: u8) -> Result<(), CallRejected> {
        if !is_callable(number) {
            return Err(CallRejected::OutOfRange(number));
        }
        if !matches!(self.phase, SessionPhase::Active(_)) {
            return Err(CallRejected::GameNotActive);
        }
        if !self.is_my_turn() {
            return Err(CallRejected::NotYourTurn);
        }
        match self.action {
            TurnAction::Submitting(_) | TurnAction::HandingOff(_) => {
                return Err(CallRejected::InFlight);
            },
            TurnAction::HandoffPending => return Err(CallRejected::HandoffPending),
            TurnAction::Idle => {},
        }
        if self.ledger.contains(number) {
            return Err(CallRejected::AlreadyCalled(number));
        }
        Ok(())
    }

    /// The authority acknowledged the call: record it optimistically and move
    /// on to the turn handoff.
    pub fn call_accepted(&mut self, number: u8) -> Option<WinSignal> {
        let record = CallRecord {
            number,
            caller_id: Some(self.identity.player_id),
        };
        let added = self.ledger.record(record.number, record.caller_id);
        if added {
            self.pending = Some(record);
            self.events.push(SessionEvent::NumberCalled(record));
        }
        self.action = TurnAction::HandingOff(number);
        self.sync_timer();
        let signal = self.remark();
        if signal.is_some() {
            return signal;
        }
        self.reclaim(added)
    }

    /// The call was refused or the request failed. Clears the guard.
    pub fn call_failed(&mut self, number: u8, origin: CallOrigin, message: String) {
        tracing::warn!(number, ?origin, error = %message, "Call submission failed");
        self.action = TurnAction::Idle;
        if origin == CallOrigin::Manual {
            self.events.push(SessionEvent::ActionFailed {
                action: SessionAction::Call,
                message,
            });
        }
        self.sync_timer();
    }

    /// Re-enter the handoff step after a failed transfer.
    pub fn retry_handoff(&mut self) -> bool {
        if self.action != TurnAction::HandoffPending || !self.is_my_turn() {
            return false;
        }
        let last = self.pending.map(|p| p.number).unwrap_or_default();
        self.action = TurnAction::HandingOff(last);
        true
    }

    /// Pick the player to receive the turn.
    pub fn handoff_target(&self, players: &[PlayerEntry]) -> Option<PlayerId> {
        handoff_target(players, self.identity.player_id)
    }

    pub fn handoff_finished(&mut self, result: HandoffResult) {
        match result {
            HandoffResult::Passed(next) => {
                tracing::debug!(next = %next, "Turn handed off");
                self.action = TurnAction::Idle;
                self.turn.current_turn_player_id = Some(next);
                if matches!(self.phase, SessionPhase::Active(_)) {
                    self.set_phase(SessionPhase::Active(TurnOwner::Opponent));
                }
            },
            HandoffResult::NoOpponent => {
                tracing::info!(room = %self.identity.room_id, "No other player to hand the turn to");
                self.action = TurnAction::Idle;
            },
            HandoffResult::Failed => {
                tracing::warn!(room = %self.identity.room_id, "Turn handoff failed, will retry");
                self.action = TurnAction::HandoffPending;
                self.events.push(SessionEvent::ActionFailed {
                    action: SessionAction::Handoff,
                    message: "failed to pass the turn".to_string(),
                });
            },
        }
        self.sync_timer();
    }

    /// The win check request itself failed. The claim is repeated on the
    /// next poll.
    pub fn win_check_failed(&mut self, message: String) {
        if self.detector.has_signalled() && !self.is_concluded() {
            self.claim = WinClaim::Retry;
        }
        self.events.push(SessionEvent::ActionFailed {
            action: SessionAction::WinCheck,
            message,
        });
    }

    /// Repeat an unconfirmed claim: always after a failed request, and after
    /// a "no winner" answer only once new numbers arrived.
    fn reclaim(&mut self, ledger_grew: bool) -> Option<WinSignal> {
        let due = match self.claim {
            WinClaim::Settled => false,
            WinClaim::Retry => true,
            WinClaim::Rejected => ledger_grew,
        };
        if !due || !self.detector.progress().is_complete() {
            return None;
        }
        self.claim = WinClaim::Settled;
        tracing::info!(room = %self.identity.room_id, "Repeating win claim");
        self.events.push(SessionEvent::WinClaimed);
        Some(WinSignal {
            completed_lines: self.detector.completed_lines(),
        })
    }

    /// Record a failure of a non-call action for the player to see.
    pub fn action_failed(&mut self, action: SessionAction, message: String) {
        self.events
            .push(SessionEvent::ActionFailed { action, message });
    }

    // --- timer ---

    pub fn timer_tick(&mut self) -> TimerOutcome {
        match self.timer.tick() {
            TimerTick::Idle => TimerOutcome::Idle,
            TimerTick::Counting(remaining) => {
                self.events.push(SessionEvent::TimerTick(remaining));
                TimerOutcome::Counting(remaining)
            },
            TimerTick::Expired => {
                self.events.push(SessionEvent::TimerTick(0));
                match self.ledger.choose_available(&mut self.rng) {
                    Some(number) => {
                        tracing::info!(number, "Turn timer expired, auto-picking");
                        self.events.push(SessionEvent::AutoPicked(number));
                        TimerOutcome::AutoPick(number)
                    },
                    None => {
                        tracing::warn!(
                            room = %self.identity.room_id,
                            "Turn timer expired with no numbers left to call"
                        );
                        TimerOutcome::Exhausted
                    },
                }
            },
        }
    }

    /// Run the timer only while the turn is ours, the game is active and no
    /// call or handoff is outstanding.
    fn sync_timer(&mut self) {
        let should_run = self.is_my_turn() && self.action == TurnAction::Idle;
        if should_run && !self.timer.is_running() {
            self.timer.start();
            self.events
                .push(SessionEvent::TimerStarted(self.timer.duration()));
        } else if !should_run && self.timer.is_running() {
            self.timer.stop();
            self.events.push(SessionEvent::TimerStopped);
        }
    }

    /// Stop everything local. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.timer.is_running() {
            self.timer.stop();
            self.events.push(SessionEvent::TimerStopped);
        }
        self.action = TurnAction::Idle;
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "Session phase change");
            self.phase = phase.clone();
            self.events.push(SessionEvent::PhaseChanged(phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingo_core::test_helpers::{active_room, make_players, records, sequential_rows};
    use uuid::Uuid;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            player_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            user_name: "me".to_string(),
        }
    }

    fn my_turn_session() -> Session {
        let mut s = Session::with_seed(identity(), 10, 7);
        s.load_ticket(&sequential_rows()).unwrap();
        let me = s.player_id();
        s.apply_room(&active_room(me));
        s
    }

    fn completed_room(turn: PlayerId) -> RoomSnapshot {
        RoomSnapshot {
            status: RoomStatus::Completed,
            current_turn_player_id: Some(turn),
            player_count: 2,
        }
    }

    #[test]
    fn starts_loading_without_timer() {
        let s = Session::with_seed(identity(), 10, 1);
        assert_eq!(s.phase(), &SessionPhase::Loading);
        assert!(!s.is_timer_running());
        assert!(s.polls_turn_and_draws());
    }

    #[test]
    fn my_turn_starts_timer() {
        let mut s = my_turn_session();
        assert_eq!(s.phase(), &SessionPhase::Active(TurnOwner::Mine));
        assert_eq!(s.timer_remaining(), Some(10));
        assert!(s.drain_events().contains(&SessionEvent::TimerStarted(10)));
    }

    #[test]
    fn losing_turn_stops_timer() {
        let mut s = my_turn_session();
        s.apply_room(&active_room(Uuid::new_v4()));
        assert_eq!(s.phase(), &SessionPhase::Active(TurnOwner::Opponent));
        assert!(!s.is_timer_running());
    }

    #[test]
    fn out_of_range_call_leaves_ledger_alone() {
        let mut s = my_turn_session();
        assert_eq!(
            s.begin_call(26, CallOrigin::Manual),
            Err(CallRejected::OutOfRange(26))
        );
        assert_eq!(
            s.begin_call(0, CallOrigin::Manual),
            Err(CallRejected::OutOfRange(0))
        );
        assert!(s.ledger().is_empty());
        assert!(!s.call_in_flight());
    }

    #[test]
    fn already_called_is_rejected() {
        let mut s = my_turn_session();
        s.apply_history(&records(&[9]));
        assert_eq!(
            s.begin_call(9, CallOrigin::Manual),
            Err(CallRejected::AlreadyCalled(9))
        );
    }

    #[test]
    fn not_my_turn_is_rejected() {
        let mut s = Session::with_seed(identity(), 10, 1);
        s.apply_room(&active_room(Uuid::new_v4()));
        assert_eq!(
            s.begin_call(5, CallOrigin::Manual),
            Err(CallRejected::NotYourTurn)
        );
    }

    #[test]
    fn in_flight_guard_blocks_second_call() {
        let mut s = my_turn_session();
        assert_eq!(s.begin_call(5, CallOrigin::Manual), Ok(5));
        assert!(s.call_in_flight());
        assert!(!s.is_timer_running());
        assert_eq!(
            s.begin_call(6, CallOrigin::Timer),
            Err(CallRejected::InFlight)
        );
    }

    #[test]
    fn accepted_call_is_optimistic() {
        let mut s = my_turn_session();
        s.begin_call(3, CallOrigin::Manual).unwrap();
        s.call_accepted(3);
        assert!(s.ledger().contains(3));
        assert!(s.is_my_pick(3));
        assert!(s.ticket().unwrap().is_marked(0, 2));
        // Still guarded until the handoff completes
        assert!(s.call_in_flight());
        assert!(!s.is_timer_running());

        // A poll that has not seen the call yet keeps it
        s.apply_history(&records(&[]));
        assert!(s.ledger().contains(3));
        // Once the remote lists it, remote is the source of truth
        s.apply_history(&records(&[3]));
        assert_eq!(s.ledger().called_numbers(), vec![3]);
    }

    #[test]
    fn successful_handoff_passes_turn() {
        let mut s = my_turn_session();
        let players = vec![
            PlayerEntry {
                player_id: s.player_id(),
                user_name: None,
            },
            make_players(1).remove(0),
        ];
        s.begin_call(3, CallOrigin::Manual).unwrap();
        s.call_accepted(3);
        let next = s.handoff_target(&players).unwrap();
        s.handoff_finished(HandoffResult::Passed(next));
        assert!(!s.call_in_flight());
        assert_eq!(s.phase(), &SessionPhase::Active(TurnOwner::Opponent));
        assert!(!s.is_timer_running());
    }

    #[test]
    fn handoff_with_no_opponent_keeps_turn() {
        let mut s = my_turn_session();
        let players = vec![PlayerEntry {
            player_id: s.player_id(),
            user_name: None,
        }];
        s.begin_call(3, CallOrigin::Manual).unwrap();
        s.call_accepted(3);
        assert_eq!(s.handoff_target(&players), None);
        s.handoff_finished(HandoffResult::NoOpponent);
        assert!(!s.call_in_flight());
        assert!(s.is_my_turn());
        assert!(s.is_timer_running());
        assert_eq!(s.begin_call(4, CallOrigin::Manual), Ok(4));
    }

    #[test]
    fn failed_handoff_clears_guard_and_retries_on_poll() {
        let mut s = my_turn_session();
        s.begin_call(3, CallOrigin::Manual).unwrap();
        s.call_accepted(3);
        s.handoff_finished(HandoffResult::Failed);

        assert!(!s.call_in_flight());
        assert!(s.handoff_pending());
        assert!(!s.is_timer_running());
        // The call is not rolled back
        assert!(s.ledger().contains(3));
        assert_eq!(
            s.begin_call(4, CallOrigin::Manual),
            Err(CallRejected::HandoffPending)
        );

        let me = s.player_id();
        assert!(s.apply_room(&active_room(me)));
        assert!(s.retry_handoff());
        assert!(s.call_in_flight());
    }

    #[test]
    fn opponent_turn_clears_pending_handoff() {
        let mut s = my_turn_session();
        s.begin_call(3, CallOrigin::Manual).unwrap();
        s.call_accepted(3);
        s.handoff_finished(HandoffResult::Failed);
        assert!(!s.apply_room(&active_room(Uuid::new_v4())));
        assert!(!s.handoff_pending());
    }

    #[test]
    fn failed_call_clears_guard_and_restarts_timer() {
        let mut s = my_turn_session();
        s.begin_call(3, CallOrigin::Manual).unwrap();
        s.call_failed(3, CallOrigin::Manual, "conflict".to_string());
        assert!(!s.call_in_flight());
        assert!(s.is_timer_running());
        assert!(!s.ledger().contains(3));
        assert!(s.drain_events().iter().any(|e| matches!(
            e,
            SessionEvent::ActionFailed {
                action: SessionAction::Call,
                ..
            }
        )));
    }

    #[test]
    fn timer_expiry_auto_picks_uncalled_number() {
        let mut s = my_turn_session();
        s.apply_history(&records(&(1..=20).collect::<Vec<_>>()));
        let mut outcome = TimerOutcome::Idle;
        for _ in 0..10 {
            outcome = s.timer_tick();
        }
        match outcome {
            TimerOutcome::AutoPick(n) => {
                assert!((21..=25).contains(&n));
                assert_eq!(s.begin_call(n, CallOrigin::Timer), Ok(n));
            },
            other => panic!("expected auto-pick, got {other:?}"),
        }
    }

    #[test]
    fn timer_expiry_with_full_ledger_is_noop() {
        let mut s = my_turn_session();
        // The win claim is unconfirmed, so the session stays active
        s.apply_history(&records(&(1..=25).collect::<Vec<_>>()));
        for _ in 0..9 {
            s.timer_tick();
        }
        assert_eq!(s.timer_tick(), TimerOutcome::Exhausted);
        assert!(s.ledger().len() == 25);
        assert!(!s.call_in_flight());
    }

    #[test]
    fn completed_status_stops_polling_and_timer() {
        let mut s = my_turn_session();
        let me = s.player_id();
        s.apply_room(&completed_room(me));
        assert_eq!(
            s.phase(),
            &SessionPhase::Completed(Conclusion::AwaitingWinner)
        );
        assert!(!s.polls_turn_and_draws());
        assert!(!s.is_timer_running());

        // Stale my-turn snapshots are ignored from now on
        s.apply_room(&active_room(me));
        assert!(!s.is_timer_running());
        assert_eq!(
            s.begin_call(5, CallOrigin::Manual),
            Err(CallRejected::GameNotActive)
        );
    }

    #[test]
    fn completed_before_active_never_starts_timer() {
        let mut s = Session::with_seed(identity(), 10, 3);
        let me = s.player_id();
        s.apply_room(&completed_room(me));
        assert!(!s.is_timer_running());
        assert!(
            !s.drain_events()
                .iter()
                .any(|e| matches!(e, SessionEvent::TimerStarted(_)))
        );
    }

    #[test]
    fn full_card_claims_win_once() {
        let mut s = my_turn_session();
        let signal = s.apply_history(&records(&(1..=25).collect::<Vec<_>>()));
        assert!(signal.is_some());
        assert!(s.apply_history(&records(&(1..=25).collect::<Vec<_>>())).is_none());
        let claims = s
            .drain_events()
            .iter()
            .filter(|e| **e == SessionEvent::WinClaimed)
            .count();
        assert_eq!(claims, 1);
    }

    #[test]
    fn rejected_claim_repeats_only_when_ledger_grows() {
        let mut s = my_turn_session();
        // Four rows plus column 0
        let full: Vec<u8> = (1..=21).collect();
        assert!(s.apply_history(&records(&full)).is_some());
        assert!(s.apply_winner(WinnerReport::default()).is_none());

        assert!(s.apply_history(&records(&full)).is_none());

        let grown: Vec<u8> = (1..=22).collect();
        assert!(s.apply_history(&records(&grown)).is_some());
        assert!(s.apply_history(&records(&grown)).is_none());
    }

    #[test]
    fn failed_win_check_retries_on_next_poll() {
        let mut s = my_turn_session();
        let all: Vec<u8> = (1..=25).collect();
        assert!(s.apply_history(&records(&all)).is_some());
        s.win_check_failed("timed out".to_string());

        assert!(s.apply_history(&records(&all)).is_some());
        // One retry per failure
        assert!(s.apply_history(&records(&all)).is_none());
        let claims = s
            .drain_events()
            .iter()
            .filter(|e| **e == SessionEvent::WinClaimed)
            .count();
        assert_eq!(claims, 2);
    }

    #[test]
    fn mark_without_ticket_is_reported() {
        let mut s = Session::with_seed(identity(), 10, 3);
        assert_eq!(s.toggle_mark(0, 0), (MarkOutcome::NoTicket, None));
    }

    #[test]
    fn negative_winner_report_keeps_session() {
        let mut s = my_turn_session();
        assert!(s.apply_winner(WinnerReport::default()).is_none());
        assert!(!s.is_concluded());
    }

    #[test]
    fn positive_winner_report_concludes() {
        let mut s = my_turn_session();
        let me = s.player_id();
        let result = s
            .apply_winner(WinnerReport {
                winner: true,
                player_id: Some(me),
                player_name: Some("me".to_string()),
                is_draw: false,
            })
            .unwrap();
        assert!(result.is_winner(me));
        assert!(s.is_concluded());
        assert!(!s.is_timer_running());
        assert!(!s.polls_turn_and_draws());
    }

    #[test]
    fn bad_ticket_keeps_existing_one() {
        let mut s = my_turn_session();
        let before = s.ticket().cloned();
        let mut rows = sequential_rows();
        rows.truncate(3);
        assert_eq!(s.load_ticket(&rows), Err(TicketError::RowCount(3)));
        assert_eq!(s.ticket().cloned(), before);
    }

    #[test]
    fn manual_mark_cannot_unmark() {
        let mut s = my_turn_session();
        s.apply_history(&records(&[1]));
        assert_eq!(s.toggle_mark(0, 0).0, MarkOutcome::AlreadyMarked);
        assert!(s.ticket().unwrap().is_marked(0, 0));
        assert_eq!(s.toggle_mark(0, 1).0, MarkOutcome::NotCalled);
    }

    #[test]
    fn opponent_pick_attribution() {
        let mut s = my_turn_session();
        let them = Uuid::new_v4();
        s.apply_history(&[CallRecord {
            number: 11,
            caller_id: Some(them),
        }]);
        assert!(s.is_opponent_pick(11));
        assert!(!s.is_my_pick(11));
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut s = my_turn_session();
        s.teardown();
        s.teardown();
        assert!(!s.is_timer_running());
    }
}
