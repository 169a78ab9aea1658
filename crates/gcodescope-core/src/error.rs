//! Error handling for gcodescope
//!
//! Provides error types for all layers of the viewer pipeline:
//! - Pipeline errors (state machine, model lookups, worker link)
//! - Init errors (capability checks at startup)
//! - Config errors (option maps handed in by the host)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Pipeline error type
///
/// Raised by the controller when a host call does not fit the current
/// pipeline state or references data that is not in the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The pipeline has not been initialized
    #[error("Pipeline not initialized")]
    NotInitialized,

    /// Operation requires another pipeline state
    #[error("Invalid pipeline state: expected {expected}, found {actual}")]
    InvalidState {
        /// The state the operation requires.
        expected: String,
        /// The state the pipeline is in.
        actual: String,
    },

    /// Layer index outside the model
    #[error("Layer {layer} not found (model has {available} layers)")]
    LayerNotFound {
        /// The requested layer.
        layer: usize,
        /// Number of layers in the model.
        available: usize,
    },

    /// Command sub-range outside a layer
    #[error("Commands {first}..={last} out of range for layer {layer} ({len} commands)")]
    CommandRangeOutOfBounds {
        /// Layer the range refers to.
        layer: usize,
        /// First command of the range.
        first: usize,
        /// Last command of the range.
        last: usize,
        /// Number of commands in the layer.
        len: usize,
    },

    /// Background worker is gone
    #[error("Worker disconnected")]
    WorkerDisconnected,
}

/// Init error type
///
/// Represents failures of the startup capability check.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    /// One or more required capabilities are missing
    #[error("Missing required capabilities: {}", .0.join(", "))]
    MissingCapabilities(Vec<String>),

    /// `init` was called twice
    #[error("Pipeline already initialized")]
    AlreadyInitialized,

    /// The configuration handed to `init` does not validate
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background worker could not be started
    #[error("Failed to start background worker: {0}")]
    WorkerUnavailable(String),
}

/// Config error type
///
/// Represents invalid option maps handed to the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Options must be given as a key/value object
    #[error("Options must be an object, got {0}")]
    NotAnObject(String),

    /// A recognized option carries a value of the wrong shape
    #[error("Invalid value for option '{key}': {reason}")]
    InvalidValue {
        /// The option name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Main error type for gcodescope
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Init error
    #[error(transparent)]
    Init(#[from] InitError),

    /// Config error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a startup capability failure
    pub fn is_init_error(&self) -> bool {
        matches!(self, Error::Init(_))
    }

    /// Check if this is a config error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
