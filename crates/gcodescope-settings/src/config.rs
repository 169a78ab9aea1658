//! Viewer configuration
//!
//! Configuration is organized into the three sections the viewer host hands
//! to the pipeline:
//! - Reader options (forwarded to the worker, post-processing switches)
//! - Renderer options (geometry emission)
//! - UI options (host conveniences)
//!
//! Field names use camelCase on disk, matching the option keys accepted by
//! the pipeline's `set_option`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SettingsError, SettingsResult};

/// XY offset applied to moves made with a given tool
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolOffset {
    pub x: f64,
    pub y: f64,
}

/// Print bed geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedSettings {
    /// Bed width (mm), rectangular beds
    pub x: f64,
    /// Bed depth (mm), rectangular beds
    pub y: f64,
    /// Bed radius (mm), circular beds
    pub r: f64,
    /// Circular bed centered on the origin
    pub circular: bool,
}

impl Default for BedSettings {
    fn default() -> Self {
        Self {
            x: 200.0,
            y: 200.0,
            r: 100.0,
            circular: false,
        }
    }
}

impl BedSettings {
    /// Whether an XY point lies on the bed
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.circular {
            x * x + y * y <= self.r * self.r
        } else {
            (0.0..=self.x).contains(&x) && (0.0..=self.y).contains(&y)
        }
    }
}

/// Lookup structure used to map progress percentages to commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexStrategy {
    /// Balanced tree keyed by percentage
    #[default]
    Tree,
    /// Per-layer percentage ranges with binary search inside a layer
    LayerRanges,
}

impl std::fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree => write!(f, "tree"),
            Self::LayerRanges => write!(f, "layerRanges"),
        }
    }
}

/// Reader options
///
/// `sort_layers`, `purge_empty_layers` and `index_strategy` are applied by the
/// pipeline after parsing; the rest are forwarded to the worker at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderOptions {
    /// Reorder layers by ascending Z before indexing
    pub sort_layers: bool,
    /// Drop layers without any extruding command
    pub purge_empty_layers: bool,
    /// Number of layers the worker reports in its first batch
    pub first_report: usize,
    /// Per-tool XY offsets, indexed by tool number
    pub tool_offsets: Vec<ToolOffset>,
    /// Bed geometry
    pub bed: BedSettings,
    /// Do not flag extrusions that end outside the bed
    pub ignore_outside_bed: bool,
    /// G90/G91 also switch the extruder between absolute and relative
    pub g90_influences_extruder: bool,
    /// Lowest Z the bed can be at
    pub bed_z: f64,
    /// Percentage lookup structure
    pub index_strategy: IndexStrategy,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            sort_layers: false,
            purge_empty_layers: true,
            first_report: 5,
            tool_offsets: vec![ToolOffset::default()],
            bed: BedSettings::default(),
            ignore_outside_bed: false,
            g90_influences_extruder: false,
            bed_z: 0.0,
            index_strategy: IndexStrategy::default(),
        }
    }
}

/// Renderer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererOptions {
    /// Emit travel moves as geometry
    pub show_moves: bool,
    /// Collect retraction points
    pub show_retracts: bool,
    /// Line width handed to the rasterizer (mm)
    pub extrusion_width: f64,
    /// Recenter the object on its bounding-box midpoint
    pub move_model: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            show_moves: false,
            show_retracts: true,
            extrusion_width: 0.4,
            move_model: true,
        }
    }
}

/// UI options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiOptions {
    /// Select the layer of the located command on percentage queries
    pub follow_progress: bool,
    /// Accept files dropped onto the view (only if supported by the host)
    pub drag_and_drop: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            follow_progress: true,
            drag_and_drop: true,
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub reader: ReaderOptions,
    pub renderer: RendererOptions,
    pub ui: UiOptions,
}

impl ViewerConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(SettingsError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(SettingsError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let bed = &self.reader.bed;
        if bed.circular {
            if bed.r <= 0.0 {
                return Err(invalid("reader.bed.r", "bed radius must be > 0"));
            }
        } else if bed.x <= 0.0 || bed.y <= 0.0 {
            return Err(invalid("reader.bed", "bed dimensions must be > 0"));
        }

        if self.reader.tool_offsets.is_empty() {
            return Err(invalid(
                "reader.toolOffsets",
                "at least one tool offset is required",
            ));
        }

        if !self.renderer.extrusion_width.is_finite() || self.renderer.extrusion_width <= 0.0 {
            return Err(invalid(
                "renderer.extrusionWidth",
                "extrusion width must be > 0",
            ));
        }

        Ok(())
    }
}

/// Default location of the viewer config file
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("gcodescope").join("viewer.toml"))
        .ok_or_else(|| SettingsError::ConfigDirectory("no platform config directory".into()))
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
