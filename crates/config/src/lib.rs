// Configuration loading

pub mod settings;

pub use settings::{config_dir, EngineKind, Settings};
