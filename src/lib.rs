pub mod battle;
pub mod config;
pub mod engine;
pub mod loader;
pub mod util;

pub use battle::{
    BattleDriver, BattleRuntime, BattleSnapshot, BattleStore, DriverError, FightId, Phase,
    RuntimeError, TickOutcome,
};
pub use config::Config;
pub use engine::{BattleEngine, EngineAdapter, EngineFactory, Position, ProtocolViolation, Subject};
pub use loader::{LoadError, ProgramBuffer, ProgramLoader, Slot};
