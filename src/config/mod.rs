mod settings;

pub use settings::{
    BattleConfig, Config, LoaderConfig, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_MAX_STEPS,
    EXAMPLE_CONFIG,
};
