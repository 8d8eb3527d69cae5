use std::io;

use thiserror::Error;

use super::program::{DecodeError, Slot};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {name} into {slot}: {source}")]
    Io {
        slot: Slot,
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid slot {0}; expected 0 or 1")]
    InvalidSlot(u8),

    #[error("could not decode {name} for {slot}: {source}")]
    Decode {
        slot: Slot,
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error("program for {slot} is {size} bytes, limit is {limit}")]
    TooLarge { slot: Slot, size: usize, limit: usize },

    #[error("{given} programs given, only two slots exist")]
    TooManyPrograms { given: usize },
}

impl LoadError {
    /// Slot the failed load targeted, if the error is tied to one
    pub fn slot(&self) -> Option<Slot> {
        match self {
            LoadError::Io { slot, .. }
            | LoadError::Decode { slot, .. }
            | LoadError::TooLarge { slot, .. } => Some(*slot),
            LoadError::InvalidSlot(_) | LoadError::TooManyPrograms { .. } => None,
        }
    }
}
