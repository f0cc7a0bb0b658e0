/// A line typed by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Call(u8),
    /// Zero-based cell position.
    Mark { row: usize, col: usize },
    Board,
    Restart,
    Accept,
    Leave,
    Help,
}

pub const HELP: &str = "\
commands:
  <n> | call <n>     call number n (1-25) on your turn
  mark <row> <col>   mark a called cell (1-5, 1-5)
  board              show the ticket
  restart            start a rematch after a game
  accept             join a rematch the other player started
  leave              return to the lobby";

fn grid_index(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n @ 1..=5) => Ok(n - 1),
        _ => Err(format!("{raw:?} is not a row/column between 1 and 5")),
    }
}

fn call(raw: &str) -> Result<Input, String> {
    raw.parse::<u8>()
        .map(Input::Call)
        .map_err(|_| format!("{raw:?} is not a number"))
}

pub fn parse(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let head = head.to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();

    match (head.as_str(), rest.as_slice()) {
        (n, []) if n.starts_with(|c: char| c.is_ascii_digit()) => call(n),
        ("call" | "c", [n]) => call(n),
        ("mark" | "m", [row, col]) => Ok(Input::Mark {
            row: grid_index(row)?,
            col: grid_index(col)?,
        }),
        ("board" | "b", []) => Ok(Input::Board),
        ("restart", []) => Ok(Input::Restart),
        ("accept", []) => Ok(Input::Accept),
        ("leave" | "quit" | "q", []) => Ok(Input::Leave),
        ("help" | "?", []) => Ok(Input::Help),
        _ => Err(format!("unknown command {line:?}, type help")),
    }
}
