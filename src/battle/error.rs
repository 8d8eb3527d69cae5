use thiserror::Error;

use super::scheduler::FightId;
use crate::engine::ProtocolViolation;

/// Errors from driving a fight
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The engine was called out of order. The fight has been aborted.
    #[error("fight {fight} aborted: {violation}")]
    Protocol {
        fight: FightId,
        #[source]
        violation: ProtocolViolation,
    },
}

/// Errors from talking to a [`BattleRuntime`](super::BattleRuntime)
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("battle runtime has stopped")]
    Stopped,

    #[error(transparent)]
    Driver(#[from] DriverError),
}
