//! Fight state, its store, and the driver that runs fights

mod driver;
mod error;
mod runtime;
pub mod scheduler;
mod state;
mod store;

pub use driver::{BattleDriver, TickOutcome};
pub use error::{DriverError, RuntimeError};
pub use runtime::BattleRuntime;
pub use scheduler::{FightId, FrameQueue, ScheduledTick, TickScheduler};
pub use state::{BattleSnapshot, Phase};
pub use store::{BattleStore, StorePublisher, Subscription};
