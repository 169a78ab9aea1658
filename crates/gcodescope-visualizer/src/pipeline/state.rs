//! Pipeline state and the values reported to host callbacks

use glam::DVec3;

use crate::model::SpeedSet;

/// Pipeline lifecycle
///
/// `Idle → Parsing → LayersStreaming → Analyzing → Ready`; `clear` returns
/// to `Idle` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    /// Lines sent, nothing back yet
    Parsing,
    /// Layers arriving from the worker
    LayersStreaming,
    /// Analysis requested
    Analyzing,
    /// Model processed, indexed and rendered
    Ready,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Parsing => write!(f, "Parsing"),
            Self::LayersStreaming => write!(f, "LayersStreaming"),
            Self::Analyzing => write!(f, "Analyzing"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

/// Phase a progress report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Parsing,
    Analyzing,
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsing => write!(f, "parsing"),
            Self::Analyzing => write!(f, "analyzing"),
        }
    }
}

/// Reported once a load reaches `Ready`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub layer_count: usize,
    pub command_count: usize,
    pub model_size: DVec3,
    pub total_filament: f64,
    /// Seconds
    pub print_time: f64,
    pub layer_height: f64,
}

/// Reported whenever the selected layer changes
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    /// Position in the processed model
    pub index: usize,
    /// Layer number the worker assigned
    pub source_number: usize,
    pub z: f64,
    pub command_count: usize,
    pub filament: Option<f64>,
    pub speeds: Option<SpeedSet>,
}
