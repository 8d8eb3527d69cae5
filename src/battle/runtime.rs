//! Frame-paced host for a [`BattleDriver`]
//!
//! Runs the driver inside a tokio task. Commands arrive over a channel and
//! are acknowledged once the driver has handled them, so after
//! [`BattleRuntime::play`] returns the reset snapshot is already visible.
//! Between commands the task runs at most one live tick per frame, and the
//! first tick of a fight waits a full frame.
//!
//! A fight aborted mid-tick publishes nothing; the error is handed to
//! [`BattleRuntime::wait_for_outcome`] instead.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::driver::{BattleDriver, TickOutcome};
use super::error::{DriverError, RuntimeError};
use super::scheduler::{FightId, FrameQueue};
use super::state::BattleSnapshot;
use super::store::BattleStore;
use crate::config::BattleConfig;
use crate::engine::EngineFactory;
use crate::loader::ProgramBuffer;

/// Commands to the runtime task
#[derive(Debug)]
enum RuntimeCommand {
    Play {
        first: ProgramBuffer,
        second: ProgramBuffer,
        ack: oneshot::Sender<Result<FightId, DriverError>>,
    },
    Replay {
        ack: oneshot::Sender<Result<Option<FightId>, DriverError>>,
    },
    Cancel {
        ack: oneshot::Sender<bool>,
    },
}

/// Handle to a running battle host
pub struct BattleRuntime {
    cmd_tx: mpsc::UnboundedSender<RuntimeCommand>,
    store: BattleStore,
    shutdown: CancellationToken,
    failures: watch::Receiver<Option<DriverError>>,
    task: JoinHandle<()>,
}

impl BattleRuntime {
    /// Spawn the host task on the current tokio runtime
    pub fn spawn<F>(factory: F, config: BattleConfig) -> Self
    where
        F: EngineFactory + 'static,
        F::Engine: 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let queue = FrameQueue::new();
        let driver = BattleDriver::new(factory, queue.clone(), config);
        let store = driver.store();
        let shutdown = CancellationToken::new();
        let (failure_tx, failures) = watch::channel(None);

        let host = RuntimeTask {
            driver,
            queue,
            cmd_rx,
            shutdown: shutdown.clone(),
            failures: failure_tx,
            pacer: FramePacer::new(config.frame_interval),
        };
        let task = tokio::spawn(host.run());

        Self {
            cmd_tx,
            store,
            shutdown,
            failures,
            task,
        }
    }

    pub fn store(&self) -> BattleStore {
        self.store.clone()
    }

    pub fn current(&self) -> BattleSnapshot {
        self.store.current()
    }

    /// Start a fresh fight, superseding any fight in progress
    pub async fn play(
        &self,
        first: ProgramBuffer,
        second: ProgramBuffer,
    ) -> Result<FightId, RuntimeError> {
        let (ack, rx) = oneshot::channel();
        self.send(RuntimeCommand::Play { first, second, ack })?;
        Ok(rx.await.map_err(|_| RuntimeError::Stopped)??)
    }

    /// Restart the most recent fight; `None` if nothing was played yet
    pub async fn replay(&self) -> Result<Option<FightId>, RuntimeError> {
        let (ack, rx) = oneshot::channel();
        self.send(RuntimeCommand::Replay { ack })?;
        Ok(rx.await.map_err(|_| RuntimeError::Stopped)??)
    }

    /// Stop the current fight; returns whether one was running
    pub async fn cancel(&self) -> Result<bool, RuntimeError> {
        let (ack, rx) = oneshot::channel();
        self.send(RuntimeCommand::Cancel { ack })?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Wait until the visible snapshot is terminal and return it.
    ///
    /// Fails with [`RuntimeError::Driver`] if the current fight was aborted
    /// by the engine before reaching an outcome.
    pub async fn wait_for_outcome(&self) -> Result<BattleSnapshot, RuntimeError> {
        let mut snapshots = self.store.watch();
        let mut failures = self.failures.clone();

        tokio::select! {
            biased;

            snapshot = snapshots.wait_for(BattleSnapshot::is_terminal) => {
                Ok(*snapshot.map_err(|_| RuntimeError::Stopped)?)
            }
            failure = failures.wait_for(Option::is_some) => {
                let failure = failure.map_err(|_| RuntimeError::Stopped)?.clone();
                Err(failure.map_or(RuntimeError::Stopped, RuntimeError::Driver))
            }
        }
    }

    /// Stop the host task and wait for it to exit
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "Battle runtime task failed");
        }
    }

    fn send(&self, cmd: RuntimeCommand) -> Result<(), RuntimeError> {
        self.cmd_tx.send(cmd).map_err(|_| RuntimeError::Stopped)
    }
}

/// Waits for the next frame
enum FramePacer {
    Paced(Interval),
    /// Yield to the scheduler between ticks
    Unpaced,
}

impl FramePacer {
    fn new(frame: Duration) -> Self {
        if frame.is_zero() {
            return FramePacer::Unpaced;
        }
        let mut interval = time::interval(frame);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        FramePacer::Paced(interval)
    }

    /// Start counting a fresh frame from now
    fn restart(&mut self) {
        if let FramePacer::Paced(interval) = self {
            interval.reset();
        }
    }

    async fn next_frame(&mut self) {
        match self {
            FramePacer::Paced(interval) => {
                interval.tick().await;
            }
            FramePacer::Unpaced => tokio::task::yield_now().await,
        }
    }
}

struct RuntimeTask<F: EngineFactory> {
    driver: BattleDriver<F>,
    queue: FrameQueue,
    cmd_rx: mpsc::UnboundedReceiver<RuntimeCommand>,
    shutdown: CancellationToken,
    failures: watch::Sender<Option<DriverError>>,
    pacer: FramePacer,
}

impl<F: EngineFactory> RuntimeTask<F> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    // Every handle is gone
                    None => break,
                },

                _ = self.pacer.next_frame(), if self.queue.has_pending() => {
                    self.run_frame();
                }
            }
        }

        self.driver.cancel();
        debug!("Battle runtime stopped");
    }

    fn handle_command(&mut self, cmd: RuntimeCommand) {
        match cmd {
            RuntimeCommand::Play { first, second, ack } => {
                let result = self.driver.play(first, second);
                if result.is_ok() {
                    self.fight_started();
                }
                let _ = ack.send(result);
            }
            RuntimeCommand::Replay { ack } => {
                let result = self.driver.replay();
                if matches!(result, Ok(Some(_))) {
                    self.fight_started();
                }
                let _ = ack.send(result);
            }
            RuntimeCommand::Cancel { ack } => {
                let _ = ack.send(self.driver.cancel());
            }
        }
    }

    fn fight_started(&mut self) {
        self.failures.send_replace(None);
        self.pacer.restart();
    }

    /// Run one live tick, discarding any stale ones in front of it
    fn run_frame(&mut self) {
        while let Some(tick) = self.queue.pop() {
            match self.driver.tick(tick) {
                Ok(TickOutcome::Stale) => continue,
                Ok(_) => break,
                // Already logged by the driver; the fight is over
                Err(err) => {
                    self.failures.send_replace(Some(err));
                    break;
                }
            }
        }
    }
}
