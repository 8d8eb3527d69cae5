use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::loader::program::{ProgramEncoding, DEFAULT_MAX_PROGRAM_SIZE};
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Tick ceiling; a fight reaching it without a winner is a draw
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Default pacing between ticks (~60 frames per second)
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub battle: BattleConfig,
    pub loader: LoaderConfig,
}

/// Battle driver and host pacing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleConfig {
    /// Ticks allowed before the fight is declared a draw
    pub max_steps: u64,
    /// Delay between ticks; zero means unpaced
    pub frame_interval: Duration,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
        }
    }
}

/// Program loader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub encoding: ProgramEncoding,
    /// Largest accepted program after decoding
    pub max_program_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            encoding: ProgramEncoding::Raw,
            max_program_size: DEFAULT_MAX_PROGRAM_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlConfig {
    battle: Option<TomlBattleConfig>,
    loader: Option<TomlLoaderConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlBattleConfig {
    max_steps: Option<u64>,
    frame_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlLoaderConfig {
    encoding: Option<ProgramEncoding>,
    max_program_size: Option<usize>,
}

impl Config {
    /// Load configuration from the data directory, merging with defaults.
    ///
    /// Writes the bundled example on first run. An unreadable or malformed
    /// file is logged and ignored.
    pub fn load() -> Self {
        let config_file = config_path();

        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from a specific file, merging with defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
                return Config::default();
            }
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Config::default()
            }
        }
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config: TomlConfig = toml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(battle) = toml_config.battle {
            if let Some(max_steps) = battle.max_steps {
                config.battle.max_steps = max_steps;
            }
            if let Some(ms) = battle.frame_interval_ms {
                config.battle.frame_interval = Duration::from_millis(ms);
            }
        }

        if let Some(loader) = toml_config.loader {
            if let Some(encoding) = loader.encoding {
                config.loader.encoding = encoding;
            }
            if let Some(max_program_size) = loader.max_program_size {
                config.loader.max_program_size = max_program_size;
            }
        }

        Ok(config)
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.battle.max_steps = max_steps;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.battle.frame_interval = interval;
        self
    }

    pub fn with_encoding(mut self, encoding: ProgramEncoding) -> Self {
        self.loader.encoding = encoding;
        self
    }
}
