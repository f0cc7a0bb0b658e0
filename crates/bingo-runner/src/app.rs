use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use bingo_core::player::{PlayerId, SessionIdentity, WinnerSnapshot};
use bingo_core::win::WinResult;
use bingo_session::{
    RematchCommand, RematchEvent, RematchOutcome, RoomAuthority, Session, SessionCommand,
    SessionConfig, SessionError, SessionEvent, SessionOutcome, prepare_rematch, run_rematch,
    run_session, wait_for_opponent,
};

use crate::input::{self, HELP, Input};
use crate::view::BoardView;

/// Everything one player's terminal needs for the lifetime of a room.
pub struct App<'a, A> {
    api: &'a A,
    identity: SessionIdentity,
    config: SessionConfig,
    cancel: CancellationToken,
    lines: mpsc::UnboundedReceiver<String>,
    /// Identity and result keys, as the lobby would see them.
    pairs: HashMap<String, String>,
}

impl<'a, A: RoomAuthority> App<'a, A> {
    pub fn new(
        api: &'a A,
        identity: SessionIdentity,
        config: SessionConfig,
        cancel: CancellationToken,
        lines: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let pairs = identity.to_pairs();
        Self {
            api,
            identity,
            config,
            cancel,
            lines,
            pairs,
        }
    }

    /// Wait for the room to fill, then play games until the player leaves
    /// or the process is interrupted.
    pub async fn run(mut self) -> Result<(), SessionError> {
        match wait_for_opponent(self.api, &self.identity, &self.config, &self.cancel).await {
            Ok(_) => {},
            Err(SessionError::Cancelled) => return Ok(()),
            Err(e) => return Err(e),
        }
        println!("Opponent found, game on. Type help for commands.");

        loop {
            let result = match self.play().await {
                SessionOutcome::Finished(result) => result,
                SessionOutcome::Left => {
                    WinnerSnapshot::clear_pairs(&mut self.pairs);
                    println!("Back to the lobby");
                    return Ok(());
                },
                SessionOutcome::Cancelled => return Ok(()),
            };

            self.record_result(&result);
            match self.rematch().await {
                RematchOutcome::Rematch => {
                    WinnerSnapshot::clear_pairs(&mut self.pairs);
                    prepare_rematch(self.api, &self.identity, &self.config).await;
                    println!("Rematch!");
                },
                RematchOutcome::Left => {
                    WinnerSnapshot::clear_pairs(&mut self.pairs);
                    println!("Back to the lobby");
                    return Ok(());
                },
                RematchOutcome::Cancelled => return Ok(()),
            }
        }
    }

    async fn play(&mut self) -> SessionOutcome {
        let session = Session::new(self.identity.clone(), self.config.turn_ticks);
        let mut view = BoardView::new(self.identity.player_id);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut events) = mpsc::unbounded_channel();

        let task = run_session(
            self.api,
            session,
            &self.config,
            self.cancel.child_token(),
            cmd_rx,
            event_tx,
        );
        tokio::pin!(task);
        let mut stdin_open = true;

        let outcome = loop {
            tokio::select! {
                outcome = &mut task => break outcome,
                Some(event) = events.recv() => show(&mut view, &event),
                line = self.lines.recv(), if stdin_open => {
                    let Some(line) = line else {
                        stdin_open = false;
                        let _ = cmd_tx.send(SessionCommand::Leave);
                        continue;
                    };
                    match input::parse(&line) {
                        Ok(Input::Board) => println!("{}", view.render()),
                        Ok(Input::Help) => println!("{HELP}"),
                        Ok(parsed) => match session_command(parsed) {
                            Some(cmd) => {
                                let _ = cmd_tx.send(cmd);
                            },
                            None => println!("The game is still running"),
                        },
                        Err(e) => println!("{e}"),
                    }
                },
            }
        };

        while let Ok(event) = events.try_recv() {
            show(&mut view, &event);
        }
        outcome
    }

    fn record_result(&mut self, result: &WinResult) {
        let snapshot = WinnerSnapshot {
            winner_id: result.winner_id,
            winner_name: result.winner_name.clone(),
            is_draw: result.is_draw,
        };
        snapshot.write_pairs(&mut self.pairs);
        tracing::info!(
            room = %self.identity.room_id,
            winner = %snapshot.winner_id,
            draw = snapshot.is_draw,
            "Game finished"
        );

        if let Some(stored) = WinnerSnapshot::read_pairs(&self.pairs) {
            println!("{}", result_screen(&stored, self.identity.player_id));
        }
        println!("Type restart for a rematch, accept to join one, or leave.");
    }

    async fn rematch(&mut self) -> RematchOutcome {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut events) = mpsc::unbounded_channel();

        let task = run_rematch(
            self.api,
            self.identity.room_id,
            &self.config,
            self.cancel.child_token(),
            cmd_rx,
            event_tx,
        );
        tokio::pin!(task);
        let mut stdin_open = true;

        loop {
            tokio::select! {
                outcome = &mut task => break outcome,
                Some(event) = events.recv() => match event {
                    RematchEvent::Available => {
                        println!("Your opponent started a rematch, type accept to join");
                    },
                    RematchEvent::RestartFailed(reason) => {
                        println!("Restart failed: {reason}");
                    },
                },
                line = self.lines.recv(), if stdin_open => {
                    let Some(line) = line else {
                        stdin_open = false;
                        let _ = cmd_tx.send(RematchCommand::Leave);
                        continue;
                    };
                    match input::parse(&line) {
                        Ok(Input::Help) => println!("{HELP}"),
                        Ok(parsed) => match rematch_command(parsed) {
                            Some(cmd) => {
                                let _ = cmd_tx.send(cmd);
                            },
                            None => println!("The game is over, type restart, accept or leave"),
                        },
                        Err(e) => println!("{e}"),
                    }
                },
            }
        }
    }
}

fn show(view: &mut BoardView, event: &SessionEvent) {
    if let Some(line) = view.apply(event) {
        println!("{line}");
    }
}

fn session_command(input: Input) -> Option<SessionCommand> {
    match input {
        Input::Call(n) => Some(SessionCommand::Call(n)),
        Input::Mark { row, col } => Some(SessionCommand::ToggleMark { row, col }),
        Input::Leave => Some(SessionCommand::Leave),
        Input::Board | Input::Help | Input::Restart | Input::Accept => None,
    }
}

fn rematch_command(input: Input) -> Option<RematchCommand> {
    match input {
        Input::Restart => Some(RematchCommand::Restart),
        Input::Accept => Some(RematchCommand::Accept),
        Input::Leave => Some(RematchCommand::Leave),
        Input::Call(_) | Input::Mark { .. } | Input::Board | Input::Help => None,
    }
}

fn result_screen(snapshot: &WinnerSnapshot, me: PlayerId) -> String {
    if snapshot.is_draw {
        "=== Draw ===".to_string()
    } else if snapshot.winner_id == me {
        "=== You win ===".to_string()
    } else if snapshot.winner_name.is_empty() {
        "=== You lose ===".to_string()
    } else {
        format!("=== {} wins ===", snapshot.winner_name)
    }
}
