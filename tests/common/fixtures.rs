//! Program and file fixtures

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arena::config::BattleConfig;
use arena::loader::program::WASM_MAGIC;
use arena::ProgramBuffer;

/// A small module-shaped program whose body is `tag`
pub fn program(tag: &str) -> ProgramBuffer {
    ProgramBuffer::from(program_bytes(tag))
}

pub fn program_bytes(tag: &str) -> Vec<u8> {
    let mut bytes = WASM_MAGIC.to_vec();
    bytes.extend_from_slice(&[1, 0, 0, 0]);
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

/// Two distinct programs
pub fn pair() -> (ProgramBuffer, ProgramBuffer) {
    (program("bot-one"), program("bot-two"))
}

/// Unpaced battle settings with the given tick ceiling
pub fn battle_config(max_steps: u64) -> BattleConfig {
    BattleConfig {
        max_steps,
        frame_interval: Duration::ZERO,
    }
}

/// Write a bot file into `dir`
pub fn write_bot(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// The `arena` binary, isolated to `data_dir`
pub fn arena_cmd(data_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("arena").unwrap();
    cmd.env("ARENA_DATA_DIR", data_dir).env_remove("RUST_LOG");
    cmd
}
