//! Layer model and aggregate analysis
//!
//! This module provides:
//! - `ModelStore`, the sparse layer array filled by worker replies
//! - Post-processing passes (sanitize, sort by Z, purge empty layers)
//! - `ModelInfo`, the worker's aggregate analysis served verbatim

pub mod info;
pub mod store;

pub use info::{BoundingBox, ModelInfo, SpeedSet};
pub use store::{purge_empty_layers, sanitize, sort_layers, ModelStore};
