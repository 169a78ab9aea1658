//! # gcodescope Core
//!
//! Core error types and shared type aliases for gcodescope.
//! The visualizer and settings crates build on these so that every layer of
//! the pipeline reports failures through one error hierarchy.

pub mod error;
pub mod types;

pub use error::{ConfigError, Error, InitError, PipelineError, Result};

pub use types::{
    thread_safe, thread_safe_vec, DataCallback, DataCallback2, ThreadSafe, ThreadSafeVec,
};
