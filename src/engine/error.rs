use thiserror::Error;

/// Engine operations called out of the required order.
///
/// Always a driver bug; the fight it happens in must be abandoned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("both programs are already loaded")]
    TooManyPrograms,

    #[error("engine needs two programs before initialize, {loaded} loaded")]
    NotLoaded { loaded: usize },

    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error("engine used before initialize")]
    NotInitialized,

    #[error("step called after the fight was decided")]
    StepAfterDecision,
}
