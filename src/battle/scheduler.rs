//! Tick scheduling
//!
//! The driver never loops on its own. Each tick it schedules exactly one
//! follow-up through a [`TickScheduler`]; the host decides when to run it.
//! Every scheduled tick carries the token of the fight that queued it, so a
//! tick that outlives its fight can be recognised and dropped.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifies one `play` (or `replay`) invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FightId(Uuid);

impl FightId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FightId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending request to run one tick of a fight
#[derive(Debug, Clone)]
pub struct ScheduledTick {
    pub fight: FightId,
    pub token: CancellationToken,
}

impl ScheduledTick {
    /// The fight this tick belongs to has been superseded or stopped
    pub fn is_stale(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Host-side sink for ticks the driver wants run later
pub trait TickScheduler: Send {
    fn schedule(&mut self, tick: ScheduledTick);
}

/// FIFO of pending ticks, drained by the host one frame at a time.
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    pending: Arc<Mutex<VecDeque<ScheduledTick>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<ScheduledTick> {
        self.pending.lock().pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }
}

impl TickScheduler for FrameQueue {
    fn schedule(&mut self, tick: ScheduledTick) {
        self.pending.lock().push_back(tick);
    }
}
