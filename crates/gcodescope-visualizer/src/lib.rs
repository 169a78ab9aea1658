//! # gcodescope Visualizer
//!
//! Turns G-code text into a per-layer command model, indexes it by file
//! progress and builds line geometry for a renderer.
//! Includes the worker protocol, the bundled background worker, the layer
//! model, the progress index and the pipeline controller that ties them
//! together.

pub mod gcode;
pub mod index;
pub mod model;
pub mod pipeline;
pub mod visualizer;
pub mod worker;

pub use gcode::{split_lines, Command, GcodeLine, Layer, Locator, ZKey};

pub use index::{LayerRangeIndex, PercentageIndex, PercentageTree};

pub use model::{BoundingBox, ModelInfo, ModelStore, SpeedSet};

pub use pipeline::{
    Capabilities, Capability, InitOptions, LayerInfo, ModelSummary, PipelineController,
    PipelineState, ProgressPhase, UpdateOptions,
};

pub use visualizer::{
    Bounds, CommandClip, GeometryBuilder, LineRenderer, LineSegment, RecordingRenderer,
    RenderMode, RendererLog, SceneGeometry, SegmentKind,
};

pub use worker::{
    reply_channel, Envelope, GcodeWorker, ReplyReceiver, ReplySender, ThreadWorker, WorkerCore,
    WorkerReply, WorkerRequest,
};
