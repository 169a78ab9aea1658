//! gcodescope Settings Crate
//!
//! Holds the three option sets the viewer understands (reader, renderer, ui)
//! and loads/saves them as TOML or JSON.

pub mod config;
pub mod error;

pub use config::{
    default_config_path, BedSettings, IndexStrategy, ReaderOptions, RendererOptions, ToolOffset,
    UiOptions, ViewerConfig,
};
pub use error::{SettingsError, SettingsResult};
