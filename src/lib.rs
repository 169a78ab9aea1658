//! # gcodescope
//!
//! Turns a G-code file into a per-layer command model, analyzes it, and
//! maps print progress percentages back to the command being executed.
//!
//! ## Architecture
//!
//! gcodescope is organized as a workspace with multiple crates:
//!
//! 1. **gcodescope-core** - Error types and shared callback aliases
//! 2. **gcodescope-settings** - Reader, renderer and UI options with TOML/JSON persistence
//! 3. **gcodescope-visualizer** - Worker protocol, layer model, progress index, geometry
//!    and the pipeline controller
//! 4. **gcodescope** - This crate: logging setup and the command line inspector

use std::path::Path;

use anyhow::Context;
use tracing::info;

pub use gcodescope_core::{ConfigError, Error, InitError, PipelineError, Result};
pub use gcodescope_settings as settings;
pub use gcodescope_visualizer as visualizer;

use gcodescope_settings::ViewerConfig;
use gcodescope_visualizer::pipeline::{
    Capabilities, Capability, InitOptions, LayerInfo, ModelSummary, PipelineController,
};
use gcodescope_visualizer::{Locator, ModelInfo, RecordingRenderer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting on stderr
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the report
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Result of inspecting one file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub summary: ModelSummary,
    pub info: ModelInfo,
    /// Command and layer at the requested percentage
    pub located: Option<(Locator, LayerInfo)>,
}

/// Run a file through the pipeline and report on the processed model
///
/// A terminal has no GPU surface, so the pipeline renders in software mode.
pub async fn inspect_file(
    path: &Path,
    config: ViewerConfig,
    percentage: Option<f64>,
) -> anyhow::Result<FileReport> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let mut controller = PipelineController::new();
    let mut options = InitOptions::new(Box::new(RecordingRenderer::new()));
    options.capabilities = Capabilities::all()
        .without(Capability::GpuAcceleration)
        .without(Capability::DragAndDrop);
    options.config = config;
    controller.init(options)?;

    controller.load_file(&text)?;
    controller.run_until_ready().await?;
    info!("Inspected {}", path.display());

    let summary = controller
        .summary()
        .context("pipeline ready without model info")?;
    let info = controller
        .model_info()
        .cloned()
        .context("pipeline ready without model info")?;

    let located = match percentage {
        Some(pct) => controller
            .cmd_index_for_percentage(Some(pct))
            .and_then(|loc| controller.layer_info(loc.layer).map(|layer| (loc, layer))),
        None => None,
    };

    Ok(FileReport {
        summary,
        info,
        located,
    })
}
