//! Line geometry built from the layer model

use gcodescope_settings::RendererOptions;
use glam::DVec3;
use tracing::debug;

use super::bounds::Bounds;
use crate::gcode::Layer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Extrusion,
    Travel,
}

/// One straight move between two absolute positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: DVec3,
    pub to: DVec3,
    pub kind: SegmentKind,
    pub layer: usize,
    pub cmd: usize,
}

/// Geometry handed to a renderer
///
/// Points are in model coordinates; `translation` is what the renderer
/// applies to put the bounding-box midpoint at the origin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneGeometry {
    pub segments: Vec<LineSegment>,
    pub retracts: Vec<DVec3>,
    pub bounds: Option<Bounds>,
    pub center: DVec3,
    pub translation: DVec3,
    pub line_width: f64,
}

impl SceneGeometry {
    pub fn extrusions(&self) -> impl Iterator<Item = &LineSegment> {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Extrusion)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Command sub-range of the topmost drawn layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandClip {
    pub first: usize,
    pub last: usize,
}

/// Walks the model and emits line segments
///
/// Every build is a full walk from the first layer; nothing from a previous
/// build is reused.
pub struct GeometryBuilder<'a> {
    options: &'a RendererOptions,
}

impl<'a> GeometryBuilder<'a> {
    pub fn new(options: &'a RendererOptions) -> Self {
        Self { options }
    }

    /// Build layers `0..=last_layer`, optionally clipping the last one
    ///
    /// Each segment runs between the start and end positions stored on its
    /// command, so layer order and clipping never shift where a move begins.
    pub fn build(
        &self,
        layers: &[Layer],
        last_layer: usize,
        clip: Option<CommandClip>,
    ) -> SceneGeometry {
        let mut scene = SceneGeometry {
            line_width: self.options.extrusion_width,
            ..Default::default()
        };
        let mut bounds = Bounds::new();

        let visible = layers.iter().enumerate().take(last_layer.saturating_add(1));
        for (l, layer) in visible {
            let clip = clip.filter(|_| l == last_layer);
            for (c, cmd) in layer.commands.iter().enumerate() {
                if clip.is_some_and(|clip| c > clip.last) {
                    break;
                }
                if clip.is_some_and(|clip| c < clip.first) {
                    continue;
                }
                let (from, to) = (cmd.start(), cmd.end());

                if cmd.retract && self.options.show_retracts {
                    scene.retracts.push(to);
                }

                let kind = if cmd.extrude {
                    SegmentKind::Extrusion
                } else if self.options.show_moves && from != to {
                    SegmentKind::Travel
                } else {
                    continue;
                };

                bounds.update(from);
                bounds.update(to);
                scene.segments.push(LineSegment {
                    from,
                    to,
                    kind,
                    layer: l,
                    cmd: c,
                });
            }
        }

        if bounds.is_valid() {
            scene.center = bounds.center();
            scene.bounds = Some(bounds);
        }
        if self.options.move_model {
            scene.translation = -scene.center;
        }

        debug!(
            "Built {} segments over {} layers",
            scene.segments.len(),
            last_layer.saturating_add(1).min(layers.len())
        );
        scene
    }
}
