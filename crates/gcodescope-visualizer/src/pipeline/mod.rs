//! Pipeline control
//!
//! This module provides:
//! - `PipelineController`, the single owner of worker, model and index
//! - Host capability checks run at `init`
//! - The option maps and state values exchanged with the host

pub mod capabilities;
pub mod controller;
pub mod options;
pub mod state;

pub use capabilities::{Capabilities, Capability};
pub use controller::{InitOptions, PipelineController, UpdateOptions};
pub use options::{merge_reader_options, validate_config, OptionChange};
pub use state::{LayerInfo, ModelSummary, PipelineState, ProgressPhase};
