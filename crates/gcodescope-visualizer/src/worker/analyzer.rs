//! Model analysis for the reference worker
//!
//! Walks the tokenized commands in file order and accumulates the aggregate
//! statistics returned with `analyzeDone`.

use glam::DVec3;
use std::collections::BTreeMap;

use super::tokenizer::ParsedModel;
use crate::gcode::{Command, ZKey};
use crate::model::{BoundingBox, ModelInfo, SpeedSet};

/// Number of progress reports over a full analysis
const PROGRESS_STEPS: usize = 10;

/// Running min/max over extruding positions
#[derive(Debug, Default)]
struct Extent {
    bounds: Option<(DVec3, DVec3)>,
}

impl Extent {
    fn include(&mut self, point: DVec3) {
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (min.min(point), max.max(point)),
            None => (point, point),
        });
    }

    fn finish(self) -> (DVec3, DVec3) {
        self.bounds.unwrap_or((DVec3::ZERO, DVec3::ZERO))
    }
}

/// Seconds a command takes at its feed rate
fn move_time(cmd: &Command, distance: f64) -> f64 {
    let Some(feed) = cmd.feed_rate.filter(|f| *f > 0.0) else {
        return 0.0;
    };
    let mm_per_sec = feed / 60.0;
    if distance > 0.0 {
        distance / mm_per_sec
    } else {
        cmd.e.map_or(0.0, f64::abs) / mm_per_sec
    }
}

/// Most common positive step between consecutive extruding layers
fn common_layer_height(model: &ParsedModel) -> f64 {
    let mut heights: Vec<ZKey> = model
        .layers
        .iter()
        .filter(|layer| layer.has_extrusion())
        .map(|layer| layer.z_key())
        .collect();
    heights.sort();

    let mut steps: BTreeMap<ZKey, usize> = BTreeMap::new();
    for pair in heights.windows(2) {
        let step = ZKey::from_z(pair[1].z() - pair[0].z());
        if step > ZKey::from_z(0.0) {
            *steps.entry(step).or_default() += 1;
        }
    }

    // max_by_key keeps the last maximum; iterate in reverse so ties go to the thinner step
    steps
        .iter()
        .rev()
        .max_by_key(|(_, count)| **count)
        .map(|(step, _)| step.z())
        .or_else(|| heights.first().map(|z| z.z()))
        .unwrap_or(0.0)
}

/// Compute the aggregate statistics of a tokenized model
///
/// `progress` receives a percentage roughly every tenth of the commands.
pub fn analyze(model: &ParsedModel, mut progress: impl FnMut(f64)) -> ModelInfo {
    let mut ordered: Vec<(ZKey, &Command)> = model
        .layers
        .iter()
        .flat_map(|layer| {
            let key = layer.z_key();
            layer.commands.iter().map(move |cmd| (key, cmd))
        })
        .collect();
    ordered.sort_by_key(|(_, cmd)| cmd.line);

    let total = ordered.len();
    let step = (total / PROGRESS_STEPS).max(1);

    let mut info = ModelInfo::default();
    let mut extent = Extent::default();

    for (i, (key, cmd)) in ordered.into_iter().enumerate() {
        let distance = cmd.distance();
        let delta_e = cmd.e.unwrap_or(0.0);

        if delta_e != 0.0 {
            info.total_filament += delta_e;
            *info.filament_by_layer.entry(key).or_default() += delta_e;
        }

        let seconds = move_time(cmd, distance);
        if seconds > 0.0 {
            info.print_time += seconds;
            *info.print_time_by_layer.entry(key).or_default() += seconds;
        }

        if let Some(feed) = cmd.feed_rate {
            let layer_speeds = info.speeds_by_layer.entry(key).or_default();
            if cmd.extrude {
                SpeedSet::record(&mut info.speeds.extrude, feed);
                SpeedSet::record(&mut layer_speeds.extrude, feed);
            } else if cmd.retract {
                SpeedSet::record(&mut info.speeds.retract, feed);
                SpeedSet::record(&mut layer_speeds.retract, feed);
            } else if distance > 0.0 {
                SpeedSet::record(&mut info.speeds.travel, feed);
                SpeedSet::record(&mut layer_speeds.travel, feed);
            }
        }

        if cmd.extrude {
            extent.include(cmd.start());
            extent.include(cmd.end());
        }

        if i % step == 0 {
            progress(i as f64 / total as f64 * 100.0);
        }
    }

    let (min, max) = extent.finish();
    info.min = min;
    info.max = max;
    info.model_size = max - min;
    info.bounding_box = BoundingBox::new(min, max);
    info.layer_height = common_layer_height(model);
    info.layer_cnt = model.layers.iter().filter(|l| l.has_extrusion()).count();
    info.layer_total = model.layers.len();
    info
}
