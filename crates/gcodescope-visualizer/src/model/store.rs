//! Layer model populated from worker replies

use gcodescope_settings::ReaderOptions;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

use super::info::{ModelInfo, SpeedSet};
use crate::gcode::{Layer, ZKey};
use crate::worker::{LayerPayload, MultiLayerPayload};

/// Drop holes left by layers that never arrived
pub fn sanitize(raw: &mut Vec<Option<Layer>>) {
    raw.retain(Option::is_some);
}

/// Order layers by ascending Z, keeping arrival order for equal heights
pub fn sort_layers(layers: &mut [Layer]) {
    layers.sort_by(|a, b| a.z.total_cmp(&b.z));
}

/// Drop layers without any extruding command
pub fn purge_empty_layers(layers: &mut Vec<Layer>) {
    layers.retain(Layer::has_extrusion);
}

/// Sparse layer model plus the worker's aggregate analysis
///
/// Streamed layers land in `raw` by layer number, in whatever order they
/// arrive. `process` derives the dense, post-processed `layers` from `raw`
/// without consuming it, so post-processing options can be re-applied.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    raw: Vec<Option<Layer>>,
    z_heights: BTreeMap<ZKey, usize>,
    layers: Vec<Layer>,
    info: Option<ModelInfo>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.raw.clear();
        self.z_heights.clear();
        self.layers.clear();
        self.info = None;
    }

    fn store(&mut self, layer: Layer) {
        let number = layer.source_number;
        if number >= self.raw.len() {
            self.raw.resize_with(number + 1, || None);
        }
        self.z_heights.insert(layer.z_key(), number);
        trace!("Stored layer {} at z={} ({} commands)", number, layer.z, layer.len());
        self.raw[number] = Some(layer);
    }

    /// Write one streamed layer at its layer number
    pub fn apply_layer(&mut self, payload: LayerPayload) {
        if payload.layer_num != payload.z_height_object.layer {
            warn!(
                "Layer {} reported with z table entry for layer {}",
                payload.layer_num, payload.z_height_object.layer
            );
        }
        self.store(Layer::new(
            payload.layer_num,
            payload.z_height_object.z_value,
            payload.cmds,
        ));
    }

    /// Write a batch of streamed layers
    pub fn apply_multi_layer(&mut self, payload: MultiLayerPayload) {
        let MultiLayerPayload {
            layer_num,
            mut model,
            z_height_object,
        } = payload;

        for (i, number) in layer_num.into_iter().enumerate() {
            let Some(&z) = z_height_object.z_value.get(i) else {
                warn!("Layer {} has no z height, skipped", number);
                continue;
            };
            let commands = model.remove(&number).unwrap_or_default();
            self.store(Layer::new(number, z, commands));
        }
    }

    pub fn set_info(&mut self, info: ModelInfo) {
        self.info = Some(info);
    }

    /// Rebuild the dense model from the streamed layers
    pub fn process(&mut self, options: &ReaderOptions) -> &[Layer] {
        let mut raw = self.raw.clone();
        sanitize(&mut raw);
        let mut layers: Vec<Layer> = raw.into_iter().flatten().collect();

        if options.sort_layers {
            sort_layers(&mut layers);
        }
        if options.purge_empty_layers {
            let before = layers.len();
            purge_empty_layers(&mut layers);
            debug!("Purged {} empty layers", before - layers.len());
        }

        debug!(
            "Processed model: {} layers, {} commands",
            layers.len(),
            layers.iter().map(Layer::len).sum::<usize>()
        );
        self.layers = layers;
        &self.layers
    }

    /// Streamed layers, holes included
    pub fn raw_layers(&self) -> &[Option<Layer>] {
        &self.raw
    }

    pub fn z_heights(&self) -> &BTreeMap<ZKey, usize> {
        &self.z_heights
    }

    /// Worker layer number at a Z height
    pub fn layer_number_at(&self, z: f64) -> Option<usize> {
        self.z_heights.get(&ZKey::from_z(z)).copied()
    }

    /// Dense model after the last `process`
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn command_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    pub fn info(&self) -> Option<&ModelInfo> {
        self.info.as_ref()
    }

    pub fn layer_filament(&self, z: f64) -> Option<f64> {
        self.info
            .as_ref()?
            .filament_by_layer
            .get(&ZKey::from_z(z))
            .copied()
    }

    pub fn layer_speeds(&self, z: f64) -> Option<&SpeedSet> {
        self.info.as_ref()?.speeds_by_layer.get(&ZKey::from_z(z))
    }
}
