//! Where arena keeps its config and logs
//!
//! Everything lives under one data directory, `~/.arena` unless the CLI
//! picks another one at startup.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const DIR_NAME: &str = ".arena";
const LOG_FILE: &str = "arena.log";

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Fix the data directory for the rest of the process.
///
/// Only the first call has any effect; returns whether this one did.
pub fn init_data_dir(custom_path: Option<PathBuf>) -> bool {
    let chosen = custom_path.unwrap_or_else(home_data_dir);
    match DATA_DIR.set(chosen) {
        Ok(()) => true,
        Err(ignored) => {
            tracing::debug!(
                ignored = %ignored.display(),
                current = %data_dir().display(),
                "Data directory already set"
            );
            false
        }
    }
}

fn home_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(DIR_NAME),
        None => PathBuf::from(DIR_NAME),
    }
}

pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(home_data_dir)
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn log_file_path() -> PathBuf {
    logs_dir().join(LOG_FILE)
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Open `arena.log` under `logs` for appending, creating the directory
/// first if needed
pub fn open_log_file(logs: &Path) -> io::Result<File> {
    fs::create_dir_all(logs)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs.join(LOG_FILE))
}
