//! Observable fight state

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::Position;
use crate::loader::Slot;

/// Where a fight is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No fight has been started
    #[default]
    Idle,

    /// Engine set up, no tick run yet
    Initialized,

    /// Ticks are being executed
    Running,

    /// A step returned a winner code
    Won,

    /// The tick ceiling was exceeded without a winner
    Draw,
}

impl Phase {
    /// Check if the fight has concluded
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Won | Phase::Draw)
    }

    /// Check if a fight is set up or ticking
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Initialized | Phase::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Initialized => "initialized",
            Phase::Running => "running",
            Phase::Won => "won",
            Phase::Draw => "draw",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single published record of a fight.
///
/// `winner` is non-zero exactly when `phase` is [`Phase::Won`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Completed simulation ticks
    pub step: u64,
    pub bot1_position: Position,
    pub bot2_position: Position,
    pub ball_position: Position,
    /// 0 while undecided, otherwise the engine's winner code
    pub winner: u32,
    pub phase: Phase,
}

impl BattleSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// The winning slot, when the winner code names one
    pub fn winning_slot(&self) -> Option<Slot> {
        Slot::from_winner_code(self.winner)
    }

    /// Start a new fight from the engine's post-initialize positions
    pub(crate) fn reset(&mut self, positions: [Position; 3]) {
        self.step = 0;
        self.winner = 0;
        self.phase = Phase::Initialized;
        self.set_positions(positions);
    }

    pub(crate) fn set_positions(&mut self, [bot1, bot2, ball]: [Position; 3]) {
        self.bot1_position = bot1;
        self.bot2_position = bot2;
        self.ball_position = ball;
    }
}
