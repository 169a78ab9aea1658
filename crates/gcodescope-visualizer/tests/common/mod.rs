//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use gcodescope_core::{thread_safe_vec, PipelineError, ThreadSafe, ThreadSafeVec};
use gcodescope_visualizer::pipeline::{InitOptions, LayerInfo, ModelSummary, ProgressPhase};
use gcodescope_visualizer::visualizer::{RecordingRenderer, RendererLog};
use gcodescope_visualizer::worker::{
    reply_channel, Envelope, GcodeWorker, ReplySender, WorkerCore, WorkerRequest,
};
use gcodescope_visualizer::PipelineController;

/// Four Z heights first seen in the order 0 (homing), 0.2, 0.6, 0.4, then a
/// travel-only move up to 5.
pub const SAMPLE: &str = "; sample print\n\
G28\n\
G1 Z0.2 F600\n\
G1 X10 Y10 F3000\n\
G1 X20 Y10 E1 F1200\n\
G1 X20 Y20 E2\n\
G1 Z0.6 F600\n\
G1 X10 Y20 E3 F1200\n\
G1 Z0.4 F600\n\
G1 X10 Y10 E4 F1200\n\
G1 Z5 F600\n\
G1 X0 Y0 F3000\n";

/// A single extruding layer
pub const SINGLE_LAYER: &str = "G1 Z0.3\nG1 X5 Y5\nG1 X15 Y5 E1\n";

/// Worker answering on the calling thread
///
/// Requests are recorded; unless silent, each is handled at once and its
/// replies queued for the controller to pump.
pub struct InlineWorker {
    core: WorkerCore,
    replies: ReplySender,
    posted: ThreadSafeVec<&'static str>,
    silent: bool,
}

impl GcodeWorker for InlineWorker {
    fn post(&mut self, generation: u64, request: WorkerRequest) -> Result<(), PipelineError> {
        self.posted.lock().push(request.tag());
        if self.silent {
            return Ok(());
        }
        let replies = &self.replies;
        self.core
            .handle(Envelope::new(generation, request), &mut |reply| {
                replies.try_send(reply).expect("reply channel full");
            });
        Ok(())
    }
}

pub struct Harness {
    pub controller: PipelineController,
    pub posted: ThreadSafeVec<&'static str>,
    pub log: ThreadSafe<RendererLog>,
    pub progress: ThreadSafeVec<(ProgressPhase, f64)>,
    pub loaded: ThreadSafeVec<ModelSummary>,
    pub selected: ThreadSafeVec<LayerInfo>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(false, |_| {})
    }

    /// Worker that records requests but never replies
    pub fn silent() -> Self {
        Self::build(true, |_| {})
    }

    pub fn with_options(configure: impl FnOnce(&mut InitOptions)) -> Self {
        Self::build(false, configure)
    }

    fn build(silent: bool, configure: impl FnOnce(&mut InitOptions)) -> Self {
        let (tx, rx) = reply_channel();
        let posted = thread_safe_vec();
        let worker = InlineWorker {
            core: WorkerCore::new(),
            replies: tx,
            posted: posted.clone(),
            silent,
        };
        let mut controller = PipelineController::with_worker(Box::new(worker), rx);

        let renderer = RecordingRenderer::new();
        let log = renderer.log();
        let progress = thread_safe_vec();
        let loaded = thread_safe_vec();
        let selected = thread_safe_vec();

        let mut options = InitOptions::new(Box::new(renderer));
        let sink = progress.clone();
        options.on_progress = Some(Box::new(move |phase, pct| sink.lock().push((phase, pct))));
        let sink = loaded.clone();
        options.on_model_loaded = Some(Box::new(move |summary| sink.lock().push(summary)));
        let sink = selected.clone();
        options.on_layer_selected = Some(Box::new(move |info| sink.lock().push(info)));
        configure(&mut options);

        controller.init(options).expect("init failed");
        Self {
            controller,
            posted,
            log,
            progress,
            loaded,
            selected,
        }
    }

    /// Load a file and pump until nothing is left to handle
    pub fn load(&mut self, text: &str) {
        self.controller.load_file(text).expect("load failed");
        self.controller.pump().expect("pump failed");
    }

    pub fn posted(&self) -> Vec<&'static str> {
        self.posted.lock().clone()
    }

    pub fn layer_zs(&self) -> Vec<f64> {
        self.controller
            .model()
            .layers()
            .iter()
            .map(|layer| layer.z)
            .collect()
    }
}
