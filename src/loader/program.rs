//! Program buffers, bot slots and upload envelope decoding

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::error::LoadError;

/// Leading bytes of every WebAssembly module
pub const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// Default upper bound for a single decoded program
pub const DEFAULT_MAX_PROGRAM_SIZE: usize = 1_000_000;

/// Identity of one of the two competing programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::First, Slot::Second];

    /// Zero-based slot index
    pub fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }

    /// The winner code an engine reports when this slot wins (1-indexed)
    pub fn winner_code(self) -> u32 {
        self.index() as u32 + 1
    }

    /// Map a winner code back to a slot, if it names one
    pub fn from_winner_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Slot::First),
            2 => Some(Slot::Second),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = LoadError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Slot::First),
            1 => Ok(Slot::Second),
            other => Err(LoadError::InvalidSlot(other)),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.index())
    }
}

/// Immutable compiled bot program.
///
/// Cloning is cheap; clones share the same bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ProgramBuffer {
    bytes: Arc<[u8]>,
}

impl ProgramBuffer {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 of the program bytes, hex encoded
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// First 12 hex characters of [`digest`](Self::digest), for logs
    pub fn short_digest(&self) -> String {
        let mut digest = self.digest();
        digest.truncate(12);
        digest
    }

    /// Whether the bytes look like a WebAssembly module
    pub fn is_wasm(&self) -> bool {
        self.bytes.starts_with(WASM_MAGIC)
    }
}

impl fmt::Debug for ProgramBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramBuffer")
            .field("len", &self.len())
            .field("digest", &self.short_digest())
            .finish()
    }
}

impl From<Vec<u8>> for ProgramBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for ProgramBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for ProgramBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// How uploaded files are turned into program bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramEncoding {
    /// File contents are the program
    #[default]
    Raw,
    /// Accept raw modules, `0x` hex text, or a `{"wasm": "0x..."}` envelope
    Auto,
}

impl ProgramEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramEncoding::Raw => "raw",
            ProgramEncoding::Auto => "auto",
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid program envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("hex payload must start with 0x")]
    MissingHexPrefix,
}

/// JSON document produced by the bot packaging tool
#[derive(Debug, Deserialize)]
struct ProgramEnvelope {
    /// LZ4 block-compressed module, `0x` hex
    wasm: String,
    /// The same module uncompressed, `0x` hex
    #[serde(default)]
    uncompressed: Option<String>,
}

/// Decode raw upload bytes according to `encoding`.
///
/// Hex payloads are LZ4 block-compressed by the packaging tool, so they are
/// decompressed when possible; a payload that fails to decompress is taken
/// to be uncompressed.
pub fn decode(
    raw: Vec<u8>,
    encoding: ProgramEncoding,
    max_size: usize,
) -> Result<Vec<u8>, DecodeError> {
    if encoding == ProgramEncoding::Raw || raw.starts_with(WASM_MAGIC) {
        return Ok(raw);
    }

    let Ok(text) = std::str::from_utf8(&raw) else {
        return Ok(raw);
    };
    let text = text.trim();

    if text.starts_with('{') {
        let envelope: ProgramEnvelope = serde_json::from_str(text)?;
        let bytes = decode_hex(&envelope.wasm)?;
        return match decompress(bytes, max_size) {
            Ok(module) => Ok(module),
            Err(bytes) => match envelope.uncompressed.as_deref() {
                Some(uncompressed) => decode_hex(uncompressed),
                None => Ok(bytes),
            },
        };
    }

    if has_hex_prefix(text) {
        let bytes = decode_hex(text)?;
        return Ok(decompress(bytes, max_size).unwrap_or_else(|bytes| bytes));
    }

    Ok(raw)
}

fn has_hex_prefix(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with("0X")
}

fn decode_hex(text: &str) -> Result<Vec<u8>, DecodeError> {
    let text = text.trim();
    if !has_hex_prefix(text) {
        return Err(DecodeError::MissingHexPrefix);
    }
    Ok(hex::decode(&text[2..])?)
}

/// Try LZ4 block decompression; hands the input back when it is not compressed
fn decompress(bytes: Vec<u8>, max_size: usize) -> Result<Vec<u8>, Vec<u8>> {
    if bytes.starts_with(WASM_MAGIC) {
        return Err(bytes);
    }
    match lz4_flex::decompress(&bytes, max_size) {
        Ok(module) => Ok(module),
        Err(e) => {
            tracing::debug!(error = %e, "Payload is not LZ4 compressed, using it as is");
            Err(bytes)
        }
    }
}
