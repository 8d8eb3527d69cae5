//! Scripted stand-in engine for deterministic testing
//!
//! Implements [`BattleEngine`] without the native engine. The outcome is
//! fixed by a [`MockScript`]; positions are a pure function of the loaded
//! programs and the tick count, so the same programs always trace the same
//! trajectory and different programs trace different ones.
//!
//! # Example
//! ```
//! use arena::engine::mock::{MockEngineFactory, MockScript};
//! use arena::engine::EngineFactory;
//!
//! let factory = MockEngineFactory::new(MockScript::decides_at(11, 2)).recording();
//! let _engine = factory.construct();
//! assert_eq!(factory.constructed(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::{BattleEngine, EngineFactory, Position, Subject};
use crate::loader::ProgramBuffer;

/// An engine operation as observed by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Construct,
    LoadProgram { len: usize },
    Initialize,
    Step,
    Position(Subject),
}

/// When (if ever) the mock fight is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MockScript {
    /// 1-indexed tick and the winner code `step` returns on it
    pub decisive: Option<(u64, u32)>,
}

impl MockScript {
    /// `step` always returns 0
    pub fn never_decides() -> Self {
        Self { decisive: None }
    }

    /// `step` returns `winner` on tick `tick` and 0 before it
    pub fn decides_at(tick: u64, winner: u32) -> Self {
        Self {
            decisive: Some((tick, winner)),
        }
    }
}

type CallLog = Arc<Mutex<Vec<EngineCall>>>;

/// Factory for [`MockEngine`]s sharing one script
#[derive(Debug, Clone)]
pub struct MockEngineFactory {
    script: MockScript,
    calls: Option<CallLog>,
    constructed: Arc<AtomicUsize>,
}

impl MockEngineFactory {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            calls: None,
            constructed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Record every engine call for later assertions
    pub fn recording(mut self) -> Self {
        self.calls = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Calls recorded so far across all engines built by this factory
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .as_ref()
            .map(|calls| calls.lock().clone())
            .unwrap_or_default()
    }

    /// Number of engines constructed
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Clear recorded calls and the construction count
    pub fn reset(&self) {
        if let Some(calls) = &self.calls {
            calls.lock().clear();
        }
        self.constructed.store(0, Ordering::SeqCst);
    }
}

impl EngineFactory for MockEngineFactory {
    type Engine = MockEngine;

    fn construct(&self) -> MockEngine {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        let engine = MockEngine {
            script: self.script,
            programs: Vec::with_capacity(2),
            seed: 0,
            ticks: 0,
            calls: self.calls.clone(),
        };
        engine.record(EngineCall::Construct);
        engine
    }
}

/// One scripted engine instance
#[derive(Debug)]
pub struct MockEngine {
    script: MockScript,
    programs: Vec<ProgramBuffer>,
    seed: u64,
    ticks: u64,
    calls: Option<CallLog>,
}

impl MockEngine {
    pub fn programs(&self) -> &[ProgramBuffer] {
        &self.programs
    }

    /// Ticks stepped so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn record(&self, call: EngineCall) {
        if let Some(calls) = &self.calls {
            calls.lock().push(call);
        }
    }
}

impl BattleEngine for MockEngine {
    fn load_program(&mut self, program: &ProgramBuffer) {
        self.record(EngineCall::LoadProgram { len: program.len() });
        self.programs.push(program.clone());
    }

    fn initialize(&mut self) {
        self.record(EngineCall::Initialize);
        let mut hasher = Sha256::new();
        for program in &self.programs {
            hasher.update(program.as_bytes());
        }
        let digest = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        self.seed = u64::from_le_bytes(seed);
    }

    fn step(&mut self) -> u32 {
        self.record(EngineCall::Step);
        self.ticks += 1;
        match self.script.decisive {
            Some((tick, winner)) if tick == self.ticks => winner,
            _ => 0,
        }
    }

    fn position(&self, subject: Subject) -> Position {
        self.record(EngineCall::Position(subject));
        let phase = (self.seed % 1_000_000) as f32 / 1_000_000.0;
        let t = self.ticks as f32;
        match subject {
            Subject::Bot1 => Position::new(-10.0 + phase + 0.01 * t, 0.0, (0.05 * t).sin()),
            Subject::Bot2 => Position::new(10.0 - phase - 0.01 * t, 0.0, (0.05 * t).cos()),
            Subject::Ball => Position::new((0.02 * t + phase).sin() * 5.0, 1.0, 0.0),
        }
    }
}
