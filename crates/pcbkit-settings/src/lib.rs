//! PCBKit Settings Crate
//!
//! Handles engine defaults, configuration persistence, and validation.

pub mod config;
pub mod error;

pub use config::{Config, MirrorSettings, APP_DIR, CONFIG_FILE};
pub use error::{ConfigError, SettingsError, SettingsResult};
