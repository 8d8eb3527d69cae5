//! Battle Runtime Driver
//!
//! Owns the engine instance of the current fight and is the only writer of
//! the [`BattleSnapshot`]. The step loop is an explicit state machine: each
//! call to [`BattleDriver::tick`] runs one engine step and, if the fight goes
//! on, schedules exactly one successor tick.
//!
//! A fight is identified by a [`FightId`] and guarded by a cancellation
//! token. `play`, `replay` and `cancel` cancel the current token first, so a
//! tick that was already queued for the old fight finds its token cancelled
//! and becomes a no-op.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use super::error::DriverError;
use super::scheduler::{FightId, FrameQueue, ScheduledTick, TickScheduler};
use super::state::{BattleSnapshot, Phase};
use super::store::{BattleStore, StorePublisher};
use crate::config::BattleConfig;
use crate::engine::{EngineAdapter, EngineFactory, Position, ProtocolViolation};
use crate::loader::ProgramBuffer;

/// Result of running one scheduled tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a superseded or finished fight; nothing happened
    Stale,
    /// The fight goes on; the next tick has been scheduled
    Continued { step: u64 },
    /// The engine reported a winner
    Won { winner: u32 },
    /// The tick ceiling was exceeded
    Draw,
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickOutcome::Won { .. } | TickOutcome::Draw)
    }
}

/// The live engine of the current fight
struct EngineHandle<E> {
    id: FightId,
    engine: EngineAdapter<E>,
    token: CancellationToken,
}

pub struct BattleDriver<F: EngineFactory, S = FrameQueue> {
    factory: F,
    scheduler: S,
    publisher: StorePublisher,
    snapshot: BattleSnapshot,
    active: Option<EngineHandle<F::Engine>>,
    last_played: Option<(ProgramBuffer, ProgramBuffer)>,
    max_steps: u64,
}

impl<F: EngineFactory, S: TickScheduler> BattleDriver<F, S> {
    pub fn new(factory: F, scheduler: S, config: BattleConfig) -> Self {
        let snapshot = BattleSnapshot::default();
        Self {
            factory,
            scheduler,
            publisher: StorePublisher::new(snapshot),
            snapshot,
            active: None,
            last_played: None,
            max_steps: config.max_steps,
        }
    }

    /// Read handle for observers of this driver's fights
    pub fn store(&self) -> BattleStore {
        self.publisher.store()
    }

    /// The snapshot as last published
    pub fn snapshot(&self) -> BattleSnapshot {
        self.snapshot
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// A fight is set up and still has a tick outstanding
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_fight(&self) -> Option<FightId> {
        self.active.as_ref().map(|handle| handle.id)
    }

    pub fn has_played(&self) -> bool {
        self.last_played.is_some()
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    /// Start a fresh fight between `first` (slot 1) and `second` (slot 2).
    ///
    /// Any fight in progress is cancelled first. On return the reset
    /// snapshot has been published and the first tick is scheduled.
    pub fn play(
        &mut self,
        first: ProgramBuffer,
        second: ProgramBuffer,
    ) -> Result<FightId, DriverError> {
        self.cancel();
        self.last_played = Some((first.clone(), second.clone()));

        let id = FightId::new();
        let (engine, positions) = match start_engine(&self.factory, &first, &second) {
            Ok(started) => started,
            Err(violation) => return Err(self.abort(id, violation)),
        };

        let token = CancellationToken::new();
        self.active = Some(EngineHandle {
            id,
            engine,
            token: token.clone(),
        });
        self.snapshot.reset(positions);

        info!(
            fight = %id,
            first = %first.short_digest(),
            second = %second.short_digest(),
            "Fight started"
        );
        self.publisher.publish(self.snapshot);
        self.scheduler.schedule(ScheduledTick { fight: id, token });
        Ok(id)
    }

    /// Restart the most recent fight with the same programs.
    ///
    /// Returns `Ok(None)` without touching anything if nothing has been
    /// played yet.
    pub fn replay(&mut self) -> Result<Option<FightId>, DriverError> {
        let Some((first, second)) = self.last_played.clone() else {
            debug!("Replay requested before any fight, ignoring");
            return Ok(None);
        };
        self.play(first, second).map(Some)
    }

    /// Stop the current loop without starting a new fight.
    ///
    /// The snapshot keeps its last published value. Returns whether a fight
    /// was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                handle.token.cancel();
                debug!(fight = %handle.id, step = self.snapshot.step, "Fight cancelled");
                true
            }
            None => false,
        }
    }

    /// Run one scheduled tick
    pub fn tick(&mut self, tick: ScheduledTick) -> Result<TickOutcome, DriverError> {
        let fight = tick.fight;
        let handle = match self.active.as_mut() {
            Some(handle) if handle.id == fight && !tick.is_stale() => handle,
            _ => {
                trace!(fight = %fight, "Dropping stale tick");
                return Ok(TickOutcome::Stale);
            }
        };

        let result = match handle.engine.step() {
            Ok(result) => result,
            Err(violation) => return Err(self.abort(fight, violation)),
        };

        if result > 0 {
            self.snapshot.winner = result;
            self.snapshot.phase = Phase::Won;
            self.publisher.publish(self.snapshot);
            self.finish();
            info!(fight = %fight, winner = result, step = self.snapshot.step, "Fight won");
            return Ok(TickOutcome::Won { winner: result });
        }

        self.snapshot.step += 1;
        if self.snapshot.step > self.max_steps {
            self.snapshot.phase = Phase::Draw;
            self.publisher.publish(self.snapshot);
            self.finish();
            info!(fight = %fight, step = self.snapshot.step, "Fight drawn");
            return Ok(TickOutcome::Draw);
        }

        let positions = match handle.engine.positions() {
            Ok(positions) => positions,
            Err(violation) => return Err(self.abort(fight, violation)),
        };
        let token = handle.token.clone();

        self.snapshot.set_positions(positions);
        self.snapshot.phase = Phase::Running;
        self.publisher.publish(self.snapshot);
        self.scheduler.schedule(ScheduledTick { fight, token });
        Ok(TickOutcome::Continued {
            step: self.snapshot.step,
        })
    }

    fn finish(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.token.cancel();
        }
    }

    fn abort(&mut self, fight: FightId, violation: ProtocolViolation) -> DriverError {
        self.finish();
        error!(fight = %fight, %violation, "Engine protocol violation, fight aborted");
        DriverError::Protocol { fight, violation }
    }
}

impl<F: EngineFactory> BattleDriver<F, FrameQueue> {
    /// Driver with its own frame queue
    pub fn with_queue(factory: F, config: BattleConfig) -> Self {
        Self::new(factory, FrameQueue::new(), config)
    }

    /// Run queued ticks back to back until none are left.
    ///
    /// Returns the final snapshot, which is terminal if a fight was running.
    pub fn run_to_completion(&mut self) -> Result<BattleSnapshot, DriverError> {
        while let Some(tick) = self.scheduler.pop() {
            self.tick(tick)?;
        }
        Ok(self.snapshot)
    }
}

fn start_engine<F: EngineFactory>(
    factory: &F,
    first: &ProgramBuffer,
    second: &ProgramBuffer,
) -> Result<(EngineAdapter<F::Engine>, [Position; 3]), ProtocolViolation> {
    let mut engine = EngineAdapter::new(factory.construct());
    engine.load_program(first)?;
    engine.load_program(second)?;
    engine.initialize()?;
    let positions = engine.positions()?;
    Ok((engine, positions))
}
