/// Default countdown length.
pub const DEFAULT_TURN_TICKS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { remaining: u32 },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Timer was not running.
    Idle,
    /// Still counting; value is the remaining ticks.
    Counting(u32),
    /// Reached zero on this tick. The timer is Idle again.
    Expired,
}

/// Cancellable per-turn countdown. Driven externally, one `tick()` per unit.
#[derive(Debug, Clone)]
pub struct TurnTimer {
    duration: u32,
    phase: Phase,
}

impl Default for TurnTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TURN_TICKS)
    }
}

impl TurnTimer {
    pub fn new(duration: u32) -> Self {
        Self {
            duration: duration.max(1),
            phase: Phase::Idle,
        }
    }

    /// Start from the full duration. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = Phase::Running {
            remaining: self.duration,
        };
        true
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn tick(&mut self) -> TimerTick {
        match self.phase {
            Phase::Idle => TimerTick::Idle,
            Phase::Running { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.phase = Phase::Idle;
                    TimerTick::Expired
                } else {
                    self.phase = Phase::Running { remaining };
                    TimerTick::Counting(remaining)
                }
            },
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.phase {
            Phase::Idle => None,
            Phase::Running { remaining } => Some(remaining),
        }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}
