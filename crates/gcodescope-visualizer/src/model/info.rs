//! Aggregate model analysis

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gcode::ZKey;

/// Axis-aligned box in model coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Size along each axis
    pub fn extents(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }
}

/// Distinct feed rates (mm/min) seen per move type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedSet {
    pub extrude: Vec<f64>,
    #[serde(rename = "move")]
    pub travel: Vec<f64>,
    pub retract: Vec<f64>,
}

impl SpeedSet {
    /// Record a feed rate, keeping each list sorted and free of duplicates
    pub fn record(list: &mut Vec<f64>, speed: f64) {
        if let Err(pos) = list.binary_search_by(|probe| probe.total_cmp(&speed)) {
            list.insert(pos, speed);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extrude.is_empty() && self.travel.is_empty() && self.retract.is_empty()
    }
}

/// Aggregate analysis of a parsed model
///
/// Produced by the worker once per load; the pipeline stores and serves it
/// verbatim. Per-layer maps are keyed by Z height.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub min: DVec3,
    pub max: DVec3,
    pub model_size: DVec3,
    pub bounding_box: BoundingBox,
    /// Filament used by the whole model (mm)
    pub total_filament: f64,
    pub filament_by_layer: BTreeMap<ZKey, f64>,
    pub speeds: SpeedSet,
    pub speeds_by_layer: BTreeMap<ZKey, SpeedSet>,
    /// Estimated print time (seconds)
    pub print_time: f64,
    pub print_time_by_layer: BTreeMap<ZKey, f64>,
    pub layer_height: f64,
    /// Layers that deposit material
    pub layer_cnt: usize,
    /// All layers, including travel-only ones
    pub layer_total: usize,
}
