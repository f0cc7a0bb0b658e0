use serde::{Deserialize, Serialize};

use crate::ledger::{CallLedger, MAX_NUMBER, MIN_NUMBER};

/// Rows and columns on a ticket.
pub const GRID_SIZE: usize = 5;

/// Reasons a ticket payload is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    RowCount(usize),
    ColumnCount { row: usize, len: usize },
    OutOfRange { row: usize, col: usize, value: i64 },
}

impl std::fmt::Display for TicketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowCount(n) => write!(f, "ticket has {n} rows, expected {GRID_SIZE}"),
            Self::ColumnCount { row, len } => {
                write!(f, "ticket row {row} has {len} cells, expected {GRID_SIZE}")
            },
            Self::OutOfRange { row, col, value } => write!(
                f,
                "ticket cell ({row}, {col}) holds {value}, expected {MIN_NUMBER}..={MAX_NUMBER}"
            ),
        }
    }
}

impl std::error::Error for TicketError {}

/// Result of a manual mark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    /// Marks never come off once placed.
    AlreadyMarked,
    /// The cell's number has not been called.
    NotCalled,
    OutOfBounds,
    /// No ticket has been loaded yet.
    NoTicket,
}

/// A player's 5x5 grid and which cells are marked.
///
/// Invariant: a cell is only ever marked after its number was seen in a
/// ledger, and a marked cell stays marked for the life of the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    numbers: [[u8; GRID_SIZE]; GRID_SIZE],
    marked: [[bool; GRID_SIZE]; GRID_SIZE],
}

impl Ticket {
    /// Validate a raw grid. Must be exactly 5x5 with every value in 1..=25.
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self, TicketError> {
        if rows.len() != GRID_SIZE {
            return Err(TicketError::RowCount(rows.len()));
        }
        let mut numbers = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != GRID_SIZE {
                return Err(TicketError::ColumnCount {
                    row: r,
                    len: row.len(),
                });
            }
            for (c, &value) in row.iter().enumerate() {
                numbers[r][c] = u8::try_from(value)
                    .ok()
                    .filter(|n| (MIN_NUMBER..=MAX_NUMBER).contains(n))
                    .ok_or(TicketError::OutOfRange {
                        row: r,
                        col: c,
                        value,
                    })?;
            }
        }
        Ok(Self::from_grid(numbers))
    }

    pub fn from_grid(numbers: [[u8; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self {
            numbers,
            marked: [[false; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn number_at(&self, row: usize, col: usize) -> Option<u8> {
        self.numbers.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.marked
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn numbers(&self) -> &[[u8; GRID_SIZE]; GRID_SIZE] {
        &self.numbers
    }

    pub fn marked(&self) -> &[[bool; GRID_SIZE]; GRID_SIZE] {
        &self.marked
    }

    /// Mark every cell whose number is in the ledger. Never unmarks.
    /// Returns how many cells became marked.
    pub fn auto_mark(&mut self, ledger: &CallLedger) -> usize {
        let mut newly = 0;
        for r in 0..GRID_SIZE {
            for c in 0..GRID_SIZE {
                if !self.marked[r][c] && ledger.contains(self.numbers[r][c]) {
                    self.marked[r][c] = true;
                    newly += 1;
                }
            }
        }
        newly
    }

    /// Manual mark of a called cell.
    pub fn toggle_mark(&mut self, row: usize, col: usize, ledger: &CallLedger) -> MarkOutcome {
        let Some(number) = self.number_at(row, col) else {
            return MarkOutcome::OutOfBounds;
        };
        if !ledger.contains(number) {
            return MarkOutcome::NotCalled;
        }
        if self.marked[row][col] {
            return MarkOutcome::AlreadyMarked;
        }
        self.marked[row][col] = true;
        MarkOutcome::Marked
    }

    pub fn is_row_complete(&self, row: usize) -> bool {
        self.marked.get(row).is_some_and(|r| r.iter().all(|m| *m))
    }

    pub fn is_column_complete(&self, col: usize) -> bool {
        col < GRID_SIZE && self.marked.iter().all(|r| r[col])
    }

    pub fn completed_rows(&self) -> Vec<usize> {
        (0..GRID_SIZE).filter(|r| self.is_row_complete(*r)).collect()
    }

    pub fn completed_columns(&self) -> Vec<usize> {
        (0..GRID_SIZE)
            .filter(|c| self.is_column_complete(*c))
            .collect()
    }

    pub fn marked_count(&self) -> usize {
        self.marked.iter().flatten().filter(|m| **m).count()
    }
}
