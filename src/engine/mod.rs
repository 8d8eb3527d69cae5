//! Engine Adapter
//!
//! The battle engine itself is an external, deterministic module. This
//! module only describes the operations it exposes ([`BattleEngine`]) and
//! how instances are built ([`EngineFactory`]). [`EngineAdapter`] wraps an
//! instance and rejects calls made out of order.

mod adapter;
mod error;
pub mod mock;

use serde::{Deserialize, Serialize};

use crate::loader::ProgramBuffer;

pub use adapter::EngineAdapter;
pub use error::ProtocolViolation;

/// A point in arena space, copied out of the engine
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Things whose position the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Bot1,
    Bot2,
    Ball,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Bot1, Subject::Bot2, Subject::Ball];
}

/// One live engine instance.
///
/// Implementations are deterministic: the same programs fed through the
/// same call sequence produce the same results and positions.
///
/// Callers must load exactly two programs, then initialize once, then
/// step; [`EngineAdapter`] enforces that order.
pub trait BattleEngine: Send {
    /// Attach one compiled program; slot order follows call order
    fn load_program(&mut self, program: &ProgramBuffer);

    /// Finish setup after both programs are loaded
    fn initialize(&mut self);

    /// Advance one tick. Returns 0 while the fight continues, otherwise the
    /// winner code.
    fn step(&mut self) -> u32;

    /// Position as of the latest step (or initialize)
    fn position(&self, subject: Subject) -> Position;
}

/// Builds fresh, empty engine instances
pub trait EngineFactory: Send + Sync {
    type Engine: BattleEngine;

    fn construct(&self) -> Self::Engine;
}

impl<E, F> EngineFactory for F
where
    E: BattleEngine,
    F: Fn() -> E + Send + Sync,
{
    type Engine = E;

    fn construct(&self) -> E {
        self()
    }
}
