use super::{BattleEngine, Position, ProtocolViolation, Subject};
use crate::loader::ProgramBuffer;

/// Typed façade over one engine instance that checks the call protocol:
/// two loads, one initialize, then steps until a decisive result.
#[derive(Debug)]
pub struct EngineAdapter<E> {
    engine: E,
    loaded: usize,
    initialized: bool,
    decided: bool,
}

impl<E: BattleEngine> EngineAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            loaded: 0,
            initialized: false,
            decided: false,
        }
    }

    pub fn load_program(&mut self, program: &ProgramBuffer) -> Result<(), ProtocolViolation> {
        if self.initialized {
            return Err(ProtocolViolation::AlreadyInitialized);
        }
        if self.loaded == 2 {
            return Err(ProtocolViolation::TooManyPrograms);
        }
        self.engine.load_program(program);
        self.loaded += 1;
        Ok(())
    }

    pub fn initialize(&mut self) -> Result<(), ProtocolViolation> {
        if self.initialized {
            return Err(ProtocolViolation::AlreadyInitialized);
        }
        if self.loaded < 2 {
            return Err(ProtocolViolation::NotLoaded {
                loaded: self.loaded,
            });
        }
        self.engine.initialize();
        self.initialized = true;
        Ok(())
    }

    pub fn step(&mut self) -> Result<u32, ProtocolViolation> {
        if !self.initialized {
            return Err(ProtocolViolation::NotInitialized);
        }
        if self.decided {
            return Err(ProtocolViolation::StepAfterDecision);
        }
        let result = self.engine.step();
        if result > 0 {
            self.decided = true;
        }
        Ok(result)
    }

    pub fn position(&self, subject: Subject) -> Result<Position, ProtocolViolation> {
        if !self.initialized {
            return Err(ProtocolViolation::NotInitialized);
        }
        Ok(self.engine.position(subject))
    }

    /// Positions of bot 1, bot 2 and the ball, in that order
    pub fn positions(&self) -> Result<[Position; 3], ProtocolViolation> {
        Ok([
            self.position(Subject::Bot1)?,
            self.position(Subject::Bot2)?,
            self.position(Subject::Ball)?,
        ])
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}
