use std::fmt::Write;

use bingo_core::ledger::CallLedger;
use bingo_core::player::PlayerId;
use bingo_core::ticket::{GRID_SIZE, Ticket};
use bingo_core::win::{BingoProgress, WinResult};
use bingo_session::session::{Conclusion, SessionEvent, SessionPhase, TurnOwner};

/// Terminal-side copy of the session, rebuilt from events.
#[derive(Debug)]
pub struct BoardView {
    me: PlayerId,
    ticket: Option<Ticket>,
    ledger: CallLedger,
    progress: BingoProgress,
    timer: Option<u32>,
}

impl BoardView {
    pub fn new(me: PlayerId) -> Self {
        Self {
            me,
            ticket: None,
            ledger: CallLedger::new(),
            progress: BingoProgress::default(),
            timer: None,
        }
    }

    /// Fold one event in; returns a line worth printing, if any.
    pub fn apply(&mut self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::TicketLoaded(ticket) => {
                let mut ticket = ticket.clone();
                ticket.auto_mark(&self.ledger);
                self.ticket = Some(ticket);
                Some("Your ticket is ready".to_string())
            },
            SessionEvent::NumberCalled(record) => {
                self.ledger.record(record.number, record.caller_id);
                if let Some(ticket) = self.ticket.as_mut() {
                    ticket.auto_mark(&self.ledger);
                }
                let who = match record.caller_id {
                    Some(id) if id == self.me => "You",
                    Some(_) => "Opponent",
                    None => "Someone",
                };
                Some(format!("{who} called {}", record.number))
            },
            SessionEvent::ProgressChanged(progress) => {
                self.progress = *progress;
                Some(format!("BINGO: {}", progress.display()))
            },
            SessionEvent::PhaseChanged(phase) => match phase {
                SessionPhase::Loading => None,
                SessionPhase::Active(TurnOwner::Mine) => Some("Your turn".to_string()),
                SessionPhase::Active(TurnOwner::Opponent) => Some("Opponent's turn".to_string()),
                SessionPhase::Completed(Conclusion::AwaitingWinner) => {
                    Some("Game over, waiting for the result".to_string())
                },
                SessionPhase::Completed(Conclusion::Decided(_)) => None,
            },
            SessionEvent::TimerStarted(ticks) => {
                self.timer = Some(*ticks);
                Some(format!("{ticks}s to call a number"))
            },
            SessionEvent::TimerTick(left) => {
                self.timer = Some(*left);
                (*left > 0 && *left <= 3).then(|| format!("{left}..."))
            },
            SessionEvent::TimerStopped => {
                self.timer = None;
                None
            },
            SessionEvent::AutoPicked(number) => Some(format!("Time's up, calling {number}")),
            SessionEvent::CallRejected(reason) => Some(format!("Can't call: {reason}")),
            SessionEvent::ActionFailed { action, message } => {
                Some(format!("{action:?} failed: {message}"))
            },
            SessionEvent::WinClaimed => Some("Full card! Checking with the room...".to_string()),
            SessionEvent::WinConfirmed(result) => Some(self.announce(result)),
        }
    }

    pub fn announce(&self, result: &WinResult) -> String {
        if result.is_draw {
            "It's a draw".to_string()
        } else if result.is_winner(self.me) {
            "You won!".to_string()
        } else if result.winner_name.is_empty() {
            "Your opponent won".to_string()
        } else {
            format!("{} won", result.winner_name)
        }
    }

    /// Ticket grid, marked cells in brackets, plus the called numbers
    /// (yours starred) and the letters earned so far.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (letter, on) in bingo_core::win::BINGO_LETTERS
            .iter()
            .zip(self.progress.letters())
        {
            let shown = if on { *letter } else { '.' };
            let _ = write!(out, "  {shown}  ");
        }
        out.push('\n');

        match &self.ticket {
            Some(ticket) => {
                for row in 0..GRID_SIZE {
                    for col in 0..GRID_SIZE {
                        let n = ticket.number_at(row, col).unwrap_or_default();
                        if ticket.is_marked(row, col) {
                            let _ = write!(out, " [{n:>2}]");
                        } else {
                            let _ = write!(out, "  {n:>2} ");
                        }
                    }
                    out.push('\n');
                }
            },
            None => out.push_str("  (no ticket yet)\n"),
        }

        let called: Vec<String> = self
            .ledger
            .records()
            .iter()
            .map(|r| {
                if r.caller_id == Some(self.me) {
                    format!("{}*", r.number)
                } else {
                    r.number.to_string()
                }
            })
            .collect();
        let _ = write!(out, "called: {}", called.join(" "));
        if let Some(left) = self.timer {
            let _ = write!(out, "\ntime left: {left}s");
        }
        out
    }
}
