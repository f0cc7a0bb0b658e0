use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use bingo_core::win::WinResult;

use crate::authority::{RemoteError, RoomAuthority, TicketRows, with_timeout};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::{
    CallOrigin, HandoffResult, Session, SessionAction, SessionEvent, TimerOutcome,
};

/// Player input forwarded into a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Call(u8),
    ToggleMark { row: usize, col: usize },
    /// Return to the lobby without a result.
    Leave,
}

/// How a session loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Finished(WinResult),
    Left,
    Cancelled,
}

/// Handles to a spawned session loop.
pub struct SessionHandle {
    pub commands: mpsc::UnboundedSender<SessionCommand>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<SessionOutcome>,
}

/// Spawn the session loop as a tokio task.
pub fn spawn_session<A>(api: Arc<A>, session: Session, config: SessionConfig) -> SessionHandle
where
    A: RoomAuthority + Send + Sync + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        run_session(&*api, session, &config, token, cmd_rx, event_tx).await
    });

    SessionHandle {
        commands: cmd_tx,
        events: event_rx,
        cancel,
        task,
    }
}

/// Drive a session until a winner is confirmed, the player leaves, or the
/// token is cancelled. Polling and the turn timer stop exactly once on exit.
pub async fn run_session<A: RoomAuthority>(
    api: &A,
    session: Session,
    config: &SessionConfig,
    cancel: CancellationToken,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> SessionOutcome {
    let mut driver = Driver {
        api,
        session,
        timeout: config.request_timeout(),
        events,
        timer_started: false,
    };
    tracing::info!(
        room = %driver.session.room_id(),
        player = %driver.session.player_id(),
        "Session started"
    );

    if let Err(e) = driver.load_ticket().await {
        driver.report_ticket_failure(&e);
    }
    driver.flush();

    let mut poll = tokio::time::interval(config.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let tick_period = config.tick_interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + tick_period, tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => break SessionOutcome::Cancelled,
            _ = poll.tick() => driver.poll().await,
            _ = ticker.tick() => driver.tick().await,
            cmd = commands.recv() => match cmd {
                Some(SessionCommand::Call(number)) => driver.call(number, CallOrigin::Manual).await,
                Some(SessionCommand::ToggleMark { row, col }) => driver.toggle_mark(row, col).await,
                Some(SessionCommand::Leave) | None => break SessionOutcome::Left,
            },
        }
        driver.flush();
        if std::mem::take(&mut driver.timer_started) {
            // Count the first second from when the countdown began
            ticker.reset();
        }
        if let Some(result) = driver.session.result() {
            break SessionOutcome::Finished(result.clone());
        }
    };

    driver.session.teardown();
    driver.flush();
    tracing::info!(room = %driver.session.room_id(), ?outcome, "Session ended");
    outcome
}

struct Driver<'a, A> {
    api: &'a A,
    session: Session,
    timeout: Duration,
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Set when a flushed event started the turn timer.
    timer_started: bool,
}

impl<A: RoomAuthority> Driver<'_, A> {
    fn flush(&mut self) {
        for event in self.session.drain_events() {
            if matches!(event, SessionEvent::TimerStarted(_)) {
                self.timer_started = true;
            }
            // Nobody listening is fine; the loop still owns the state
            let _ = self.events.send(event);
        }
    }

    async fn fetch_ticket(&self) -> Result<TicketRows, RemoteError> {
        let player = self.session.player_id();
        let room = self.session.room_id();
        match with_timeout(self.timeout, self.api.get_ticket(player)).await {
            Err(RemoteError::NotFound) => {
                tracing::info!(player = %player, "No ticket yet, generating one");
                with_timeout(self.timeout, self.api.generate_ticket(player, room)).await
            },
            other => other,
        }
    }

    async fn load_ticket(&mut self) -> Result<(), SessionError> {
        let rows = self.fetch_ticket().await?;
        if self.session.load_ticket(&rows)?.is_some() {
            self.confirm_win().await;
        }
        Ok(())
    }

    fn report_ticket_failure(&mut self, e: &SessionError) {
        tracing::warn!(room = %self.session.room_id(), error = %e, "Failed to load ticket");
        self.session
            .action_failed(SessionAction::LoadTicket, e.to_string());
    }

    async fn poll(&mut self) {
        let room_id = self.session.room_id();
        if !self.session.polls_turn_and_draws() {
            self.poll_winner().await;
            return;
        }

        if self.session.ticket().is_none()
            && let Err(e) = self.load_ticket().await
        {
            self.report_ticket_failure(&e);
        }

        match with_timeout(self.timeout, self.api.get_room(room_id)).await {
            Ok(room) => {
                if self.session.apply_room(&room) && self.session.retry_handoff() {
                    self.handoff().await;
                }
            },
            Err(e) => tracing::warn!(room = %room_id, error = %e, "Room poll failed"),
        }

        if !self.session.polls_turn_and_draws() {
            // Completed was just observed
            self.poll_winner().await;
            return;
        }

        match with_timeout(self.timeout, self.api.get_draw_history(room_id)).await {
            Ok(history) => {
                if self.session.apply_history(&history).is_some() {
                    self.confirm_win().await;
                }
            },
            Err(e) => tracing::warn!(room = %room_id, error = %e, "Draw history poll failed"),
        }
    }

    async fn poll_winner(&mut self) {
        if self.session.is_concluded() {
            return;
        }
        let room_id = self.session.room_id();
        match with_timeout(self.timeout, self.api.get_winner(room_id)).await {
            Ok(report) => {
                if self.session.apply_winner(report).is_none() {
                    tracing::debug!(room = %room_id, "Room completed, winner not published yet");
                }
            },
            Err(e) => tracing::warn!(room = %room_id, error = %e, "Winner poll failed"),
        }
    }

    async fn tick(&mut self) {
        match self.session.timer_tick() {
            TimerOutcome::AutoPick(number) => self.call(number, CallOrigin::Timer).await,
            TimerOutcome::Counting(remaining) => tracing::debug!(remaining, "Turn timer"),
            TimerOutcome::Idle | TimerOutcome::Exhausted => {},
        }
    }

    async fn call(&mut self, number: u8, origin: CallOrigin) {
        if self.session.begin_call(number, origin).is_err() {
            return;
        }
        self.flush();

        let room_id = self.session.room_id();
        let player = self.session.player_id();
        match with_timeout(self.timeout, self.api.submit_call(room_id, player, number)).await {
            Ok(()) => {
                tracing::info!(room = %room_id, number, ?origin, "Number called");
                if self.session.call_accepted(number).is_some() {
                    self.confirm_win().await;
                }
                if !self.session.is_concluded() {
                    self.handoff().await;
                }
            },
            Err(e) => self.session.call_failed(number, origin, e.to_string()),
        }
    }

    async fn handoff(&mut self) {
        let room_id = self.session.room_id();
        let players = match with_timeout(self.timeout, self.api.list_players(room_id)).await {
            Ok(players) => players,
            Err(e) => {
                tracing::warn!(room = %room_id, error = %e, "Player lookup for handoff failed");
                self.session.handoff_finished(HandoffResult::Failed);
                return;
            },
        };
        let Some(next) = self.session.handoff_target(&players) else {
            self.session.handoff_finished(HandoffResult::NoOpponent);
            return;
        };
        let result = match with_timeout(self.timeout, self.api.set_turn(room_id, next)).await {
            Ok(()) => HandoffResult::Passed(next),
            Err(e) => {
                tracing::warn!(room = %room_id, next = %next, error = %e, "Turn update failed");
                HandoffResult::Failed
            },
        };
        self.session.handoff_finished(result);
    }

    async fn toggle_mark(&mut self, row: usize, col: usize) {
        let (outcome, signal) = self.session.toggle_mark(row, col);
        tracing::debug!(row, col, ?outcome, "Manual mark");
        if signal.is_some() {
            self.confirm_win().await;
        }
    }

    /// One `CheckWinner` per local win signal; a negative answer is not retried.
    /// A positive answer is followed by `GetWinner` for the published details.
    async fn confirm_win(&mut self) {
        let room_id = self.session.room_id();
        match with_timeout(self.timeout, self.api.check_winner(room_id)).await {
            Ok(report) if report.winner => {
                let published = match with_timeout(self.timeout, self.api.get_winner(room_id)).await {
                    Ok(published) if published.winner => published,
                    Ok(_) => report,
                    Err(e) => {
                        tracing::debug!(room = %room_id, error = %e, "Winner lookup failed, using declaration");
                        report
                    },
                };
                self.session.apply_winner(published);
            },
            Ok(report) => {
                self.session.apply_winner(report);
            },
            Err(e) => {
                tracing::warn!(room = %room_id, error = %e, "Win confirmation failed");
                self.session.win_check_failed(e.to_string());
            },
        }
    }
}
