use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::PlayerId;
use crate::ticket::Ticket;

/// Letters unlocked in order as lines complete.
pub const BINGO_LETTERS: [char; 5] = ['B', 'I', 'N', 'G', 'O'];

/// Fully marked rows and columns of a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineReport {
    pub rows: Vec<usize>,
    pub columns: Vec<usize>,
}

impl LineReport {
    pub fn evaluate(ticket: &Ticket) -> Self {
        Self {
            rows: ticket.completed_rows(),
            columns: ticket.completed_columns(),
        }
    }

    /// Row `i` and column `j` count as distinct lines.
    pub fn completed_lines(&self) -> usize {
        self.rows.len() + self.columns.len()
    }
}

/// Cumulative BINGO letters. Letter `k` is set once more than `k` lines are
/// complete, regardless of which lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BingoProgress {
    letters: [bool; 5],
}

impl BingoProgress {
    pub fn from_lines(completed_lines: usize) -> Self {
        let mut letters = [false; 5];
        for (k, letter) in letters.iter_mut().enumerate() {
            *letter = completed_lines > k;
        }
        Self { letters }
    }

    pub fn letters(&self) -> [bool; 5] {
        self.letters
    }

    pub fn count(&self) -> usize {
        self.letters.iter().filter(|l| **l).count()
    }

    pub fn is_complete(&self) -> bool {
        self.letters.iter().all(|l| *l)
    }

    /// Letter-wise OR. Letters never go back to false.
    pub fn union(self, other: Self) -> Self {
        let mut letters = self.letters;
        for (l, o) in letters.iter_mut().zip(other.letters) {
            *l |= o;
        }
        Self { letters }
    }

    /// e.g. `"BIN__"`
    pub fn display(&self) -> String {
        BINGO_LETTERS
            .iter()
            .zip(self.letters)
            .map(|(c, on)| if on { *c } else { '_' })
            .collect()
    }
}

/// Emitted once when a ticket first reaches all five letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinSignal {
    pub completed_lines: usize,
}

/// Derives letters from a ticket and remembers whether the win was already
/// announced.
#[derive(Debug, Clone, Default)]
pub struct WinDetector {
    progress: BingoProgress,
    lines: LineReport,
    notified: bool,
}

impl WinDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the ticket. Returns a signal only on the transition into
    /// a full card; later evaluations stay silent.
    pub fn observe(&mut self, ticket: &Ticket) -> Option<WinSignal> {
        self.lines = LineReport::evaluate(ticket);
        let completed = self.lines.completed_lines();
        self.progress = self.progress.union(BingoProgress::from_lines(completed));

        tracing::debug!(
            lines = completed,
            letters = %self.progress.display(),
            "Evaluated ticket"
        );

        if self.progress.is_complete() && !self.notified {
            self.notified = true;
            return Some(WinSignal {
                completed_lines: completed,
            });
        }
        None
    }

    pub fn progress(&self) -> BingoProgress {
        self.progress
    }

    pub fn lines(&self) -> &LineReport {
        &self.lines
    }

    pub fn has_signalled(&self) -> bool {
        self.notified
    }

    pub fn completed_lines(&self) -> usize {
        self.lines.completed_lines()
    }
}

/// Authoritative outcome of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinResult {
    pub winner_id: PlayerId,
    pub winner_name: String,
    pub is_draw: bool,
}

impl WinResult {
    /// The all-zero id marks a drawn game.
    pub const DRAW_ID: PlayerId = Uuid::nil();

    pub fn draw() -> Self {
        Self {
            winner_id: Self::DRAW_ID,
            winner_name: String::new(),
            is_draw: true,
        }
    }

    pub fn is_winner(&self, player: PlayerId) -> bool {
        !self.is_draw && self.winner_id == player
    }
}

/// Response of `CheckWinner` / `GetWinner`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerReport {
    pub winner: bool,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default, alias = "winnerName")]
    pub player_name: Option<String>,
    #[serde(default)]
    pub is_draw: bool,
}

impl WinnerReport {
    /// `None` while the authority has not decided.
    pub fn into_result(self) -> Option<WinResult> {
        if !self.winner {
            return None;
        }
        let winner_id = self.player_id.unwrap_or(WinResult::DRAW_ID);
        Some(WinResult {
            winner_id,
            winner_name: self.player_name.unwrap_or_default(),
            is_draw: self.is_draw || winner_id == WinResult::DRAW_ID,
        })
    }
}
