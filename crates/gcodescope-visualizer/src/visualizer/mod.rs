//! Geometry building and the renderer interface

pub mod bounds;
pub mod geometry;
pub mod renderer;

pub use bounds::Bounds;
pub use geometry::{CommandClip, GeometryBuilder, LineSegment, SceneGeometry, SegmentKind};
pub use renderer::{LineRenderer, RecordingRenderer, RenderMode, RendererLog};
