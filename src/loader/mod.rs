//! Program Loader
//!
//! Turns uploaded files into [`ProgramBuffer`]s addressed by [`Slot`].
//! Each slot loads independently; two loads may be in flight at once and
//! complete in any order. Completed loads are published to subscribers
//! through a `watch` channel, last writer wins per slot.

mod error;
pub mod program;
pub mod source;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;

pub use error::LoadError;
pub use program::{DecodeError, ProgramBuffer, ProgramEncoding, Slot};
pub use source::{FileSource, MemorySource, ProgramSource};

/// The `{slot -> program}` mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramSlots {
    slots: [Option<ProgramBuffer>; 2],
}

impl ProgramSlots {
    pub fn get(&self, slot: Slot) -> Option<&ProgramBuffer> {
        self.slots[slot.index()].as_ref()
    }

    pub fn is_set(&self, slot: Slot) -> bool {
        self.slots[slot.index()].is_some()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both programs, once both slots are occupied
    pub fn pair(&self) -> Option<(ProgramBuffer, ProgramBuffer)> {
        match &self.slots {
            [Some(first), Some(second)] => Some((first.clone(), second.clone())),
            _ => None,
        }
    }

    fn set(&mut self, slot: Slot, program: ProgramBuffer) {
        self.slots[slot.index()] = Some(program);
    }
}

/// Asynchronous loader for the two bot programs
pub struct ProgramLoader {
    slots: watch::Sender<ProgramSlots>,
    config: LoaderConfig,
}

impl ProgramLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let (slots, _) = watch::channel(ProgramSlots::default());
        Self { slots, config }
    }

    /// Read `source` fully and store it in `slot`, replacing any previous program.
    ///
    /// On failure the mapping is left untouched.
    pub async fn load<S>(&self, slot: Slot, source: &S) -> Result<ProgramBuffer, LoadError>
    where
        S: ProgramSource + ?Sized,
    {
        let name = source.name();
        debug!(slot = %slot, source = %name, "Reading program");

        let raw = source.read_all().await.map_err(|e| {
            warn!(slot = %slot, source = %name, error = %e, "Program read failed");
            LoadError::Io {
                slot,
                name: name.clone(),
                source: e,
            }
        })?;

        let bytes = program::decode(raw, self.config.encoding, self.config.max_program_size)
            .map_err(|e| LoadError::Decode {
                slot,
                name: name.clone(),
                source: e,
            })?;

        if bytes.len() > self.config.max_program_size {
            return Err(LoadError::TooLarge {
                slot,
                size: bytes.len(),
                limit: self.config.max_program_size,
            });
        }

        let program = ProgramBuffer::from(bytes);
        self.slots
            .send_modify(|slots| slots.set(slot, program.clone()));

        info!(
            slot = %slot,
            source = %name,
            bytes = program.len(),
            digest = %program.short_digest(),
            "Program loaded"
        );
        Ok(program)
    }

    /// Load `source` into `slot`; resolves once subscribers have been notified
    pub async fn add_file<S>(&self, slot: Slot, source: &S) -> Result<(), LoadError>
    where
        S: ProgramSource + ?Sized,
    {
        self.load(slot, source).await.map(|_| ())
    }

    /// Load several sources concurrently, filling slots in the order given.
    ///
    /// Every source is attempted; successful ones are stored even when
    /// another fails. The first failure is returned.
    pub async fn add_files<S>(&self, sources: &[S]) -> Result<(), LoadError>
    where
        S: ProgramSource,
    {
        if sources.len() > Slot::ALL.len() {
            return Err(LoadError::TooManyPrograms {
                given: sources.len(),
            });
        }

        let loads = Slot::ALL
            .iter()
            .zip(sources)
            .map(|(slot, source)| self.load(*slot, source));

        join_all(loads)
            .await
            .into_iter()
            .find_map(Result::err)
            .map_or(Ok(()), Err)
    }

    /// Receive every future change to the mapping
    pub fn subscribe(&self) -> watch::Receiver<ProgramSlots> {
        self.slots.subscribe()
    }

    /// Current mapping
    pub fn slots(&self) -> ProgramSlots {
        self.slots.borrow().clone()
    }

    pub fn get(&self, slot: Slot) -> Option<ProgramBuffer> {
        self.slots.borrow().get(slot).cloned()
    }

    /// Both programs, once both slots are loaded
    pub fn pair(&self) -> Option<(ProgramBuffer, ProgramBuffer)> {
        self.slots.borrow().pair()
    }
}

impl Default for ProgramLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}
