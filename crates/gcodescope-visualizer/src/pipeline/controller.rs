//! Pipeline controller
//!
//! Owns the worker handle, the model and the index. All model mutation
//! happens on the thread that calls into the controller, in the order
//! worker replies are handled.

use gcodescope_core::{ConfigError, DataCallback, DataCallback2, InitError, PipelineError};
use gcodescope_settings::{
    BedSettings, ReaderOptions, RendererOptions, ToolOffset, UiOptions, ViewerConfig,
};
use serde_json::Value;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use super::capabilities::{Capabilities, Capability};
use super::options::{merge_reader_options, validate_config};
use super::state::{LayerInfo, ModelSummary, PipelineState, ProgressPhase};
use crate::gcode::{split_lines, Locator};
use crate::index::PercentageIndex;
use crate::model::{ModelInfo, ModelStore, SpeedSet};
use crate::visualizer::{CommandClip, GeometryBuilder, LineRenderer, RenderMode, SceneGeometry};
use crate::worker::{
    reply_channel, Envelope, GcodeWorker, ParseOptions, ParseRequest, ReplyReceiver,
    ThreadWorker, WorkerReply, WorkerRequest,
};

/// Everything `init` needs from the host
pub struct InitOptions {
    pub renderer: Box<dyn LineRenderer>,
    pub capabilities: Capabilities,
    pub config: ViewerConfig,
    /// Overrides `config.reader.tool_offsets`
    pub tool_offsets: Option<Vec<ToolOffset>>,
    /// Overrides `config.reader.bed`
    pub bed_dimensions: Option<BedSettings>,
    pub on_progress: Option<DataCallback2<ProgressPhase, f64>>,
    pub on_model_loaded: Option<DataCallback<ModelSummary>>,
    pub on_layer_selected: Option<DataCallback<LayerInfo>>,
}

impl InitOptions {
    /// Full capabilities, default config, no callbacks
    pub fn new(renderer: Box<dyn LineRenderer>) -> Self {
        Self {
            renderer,
            capabilities: Capabilities::all(),
            config: ViewerConfig::default(),
            tool_offsets: None,
            bed_dimensions: None,
            on_progress: None,
            on_model_loaded: None,
            on_layer_selected: None,
        }
    }
}

/// Whole option sections to replace
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub ui: Option<UiOptions>,
    pub reader: Option<ReaderOptions>,
    pub renderer: Option<RendererOptions>,
}

/// Drives one G-code file from raw text to rendered geometry
pub struct PipelineController {
    initialized: bool,
    state: PipelineState,
    generation: u64,
    worker: Option<Box<dyn GcodeWorker>>,
    replies: Option<ReplyReceiver>,
    renderer: Option<Box<dyn LineRenderer>>,
    render_mode: RenderMode,
    config: ViewerConfig,
    store: ModelStore,
    index: PercentageIndex,
    geometry: SceneGeometry,
    selected_layer: usize,
    parse_progress: f64,
    recompute_count: usize,
    on_progress: Option<DataCallback2<ProgressPhase, f64>>,
    on_model_loaded: Option<DataCallback<ModelSummary>>,
    on_layer_selected: Option<DataCallback<LayerInfo>>,
}

impl Default for PipelineController {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineController {
    /// Controller that starts the bundled worker on `init`
    pub fn new() -> Self {
        Self {
            initialized: false,
            state: PipelineState::Idle,
            generation: 0,
            worker: None,
            replies: None,
            renderer: None,
            render_mode: RenderMode::default(),
            config: ViewerConfig::default(),
            store: ModelStore::new(),
            index: PercentageIndex::default(),
            geometry: SceneGeometry::default(),
            selected_layer: 0,
            parse_progress: 0.0,
            recompute_count: 0,
            on_progress: None,
            on_model_loaded: None,
            on_layer_selected: None,
        }
    }

    /// Controller driving a worker supplied by the host
    pub fn with_worker(worker: Box<dyn GcodeWorker>, replies: ReplyReceiver) -> Self {
        Self {
            worker: Some(worker),
            replies: Some(replies),
            ..Self::new()
        }
    }

    /// Check host capabilities, apply the configuration and start the worker
    pub fn init(&mut self, options: InitOptions) -> Result<(), InitError> {
        if self.initialized {
            return Err(InitError::AlreadyInitialized);
        }

        let missing = options.capabilities.missing_required();
        if !missing.is_empty() {
            let reasons: Vec<String> = missing.iter().map(ToString::to_string).collect();
            error!("Missing required capabilities: {}", reasons.join(", "));
            return Err(InitError::MissingCapabilities(reasons));
        }

        let mut config = options.config;
        if let Some(offsets) = options.tool_offsets {
            config.reader.tool_offsets = offsets;
        }
        if let Some(bed) = options.bed_dimensions {
            config.reader.bed = bed;
        }
        validate_config(&config).map_err(|e| InitError::InvalidConfig(e.to_string()))?;

        let mut renderer = options.renderer;
        self.render_mode = if options.capabilities.has(Capability::GpuAcceleration) {
            RenderMode::Accelerated
        } else {
            warn!("GPU acceleration unavailable, falling back to software rendering");
            RenderMode::Software
        };
        renderer.set_mode(self.render_mode);

        if !options.capabilities.has(Capability::DragAndDrop) && config.ui.drag_and_drop {
            info!("Drag and drop unavailable, disabled");
            config.ui.drag_and_drop = false;
        }

        if self.worker.is_none() {
            let (tx, rx) = reply_channel();
            let worker =
                ThreadWorker::spawn(tx).map_err(|e| InitError::WorkerUnavailable(e.to_string()))?;
            self.worker = Some(Box::new(worker));
            self.replies = Some(rx);
        }

        self.config = config;
        self.renderer = Some(renderer);
        self.on_progress = options.on_progress;
        self.on_model_loaded = options.on_model_loaded;
        self.on_layer_selected = options.on_layer_selected;
        self.initialized = true;
        info!("Pipeline initialized ({} rendering)", self.render_mode);
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), PipelineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(PipelineError::NotInitialized)
        }
    }

    fn ensure_ready(&self) -> Result<(), PipelineError> {
        if self.state == PipelineState::Ready {
            Ok(())
        } else {
            Err(PipelineError::InvalidState {
                expected: PipelineState::Ready.to_string(),
                actual: self.state.to_string(),
            })
        }
    }

    fn post(&mut self, request: WorkerRequest) -> Result<(), PipelineError> {
        let worker = self.worker.as_mut().ok_or(PipelineError::NotInitialized)?;
        debug!("Posting {} (generation {})", request.tag(), self.generation);
        worker.post(self.generation, request)
    }

    fn reset_model(&mut self) {
        self.store.clear();
        self.index = PercentageIndex::default();
        self.geometry = SceneGeometry::default();
        self.selected_layer = 0;
        self.parse_progress = 0.0;
    }

    /// Discard the model; replies still in flight are ignored
    pub fn clear(&mut self) {
        self.generation += 1;
        self.reset_model();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.draw(&self.geometry);
        }
        self.state = PipelineState::Idle;
        info!("Pipeline cleared");
    }

    /// Split the text into lines and hand them to the worker
    pub fn load_file(&mut self, text: &str) -> Result<(), PipelineError> {
        self.ensure_initialized()?;
        self.generation += 1;
        self.reset_model();

        let gcode = split_lines(text);
        info!(
            "Loading {} lines, {} bytes (generation {})",
            gcode.len(),
            text.len(),
            self.generation
        );
        let options = ParseOptions::from(&self.config.reader);
        self.post(WorkerRequest::ParseGCode(ParseRequest { gcode, options }))?;

        self.state = PipelineState::Parsing;
        self.emit_progress(ProgressPhase::Parsing, 0.0);
        Ok(())
    }

    /// Apply one worker reply
    ///
    /// Replies stamped with an older generation belong to a load that has
    /// since been replaced or cleared and are dropped.
    pub fn handle(&mut self, envelope: Envelope<WorkerReply>) -> Result<(), PipelineError> {
        if envelope.generation != self.generation {
            debug!(
                "Dropping stale {} (generation {}, current {})",
                envelope.body.tag(),
                envelope.generation,
                self.generation
            );
            return Ok(());
        }

        match envelope.body {
            WorkerReply::ReturnLayer(payload) => {
                if !self.accepts_layers() {
                    return Ok(());
                }
                let reached = payload.cmds.last().map_or(0.0, |c| c.percentage);
                self.store.apply_layer(payload);
                self.layers_received(reached);
            }
            WorkerReply::ReturnMultiLayer(payload) => {
                if !self.accepts_layers() {
                    return Ok(());
                }
                let reached = payload
                    .model
                    .values()
                    .filter_map(|cmds| cmds.last())
                    .map(|c| c.percentage)
                    .fold(0.0, f64::max);
                self.store.apply_multi_layer(payload);
                self.layers_received(reached);
            }
            WorkerReply::ReturnModel => {
                if !self.accepts_layers() {
                    return Ok(());
                }
                info!(
                    "Parse complete, {} layers received",
                    self.store.raw_layers().len()
                );
                self.state = PipelineState::Analyzing;
                self.emit_progress(ProgressPhase::Parsing, 100.0);
                self.post(WorkerRequest::AnalyzeModel {})?;
                self.emit_progress(ProgressPhase::Analyzing, 0.0);
            }
            WorkerReply::AnalyzeProgress(payload) => {
                if self.state == PipelineState::Analyzing {
                    self.emit_progress(ProgressPhase::Analyzing, payload.progress);
                }
            }
            WorkerReply::AnalyzeDone(info) => {
                if self.state != PipelineState::Analyzing {
                    warn!("analyzeDone received in state {}, ignored", self.state);
                    return Ok(());
                }
                self.store.set_info(*info);
                self.pass_data_to_renderer();
                self.state = PipelineState::Ready;
                self.emit_progress(ProgressPhase::Analyzing, 100.0);
                info!(
                    "Model ready: {} layers, {} commands",
                    self.store.layers().len(),
                    self.store.command_count()
                );
                if let Some(summary) = self.summary() {
                    if let Some(cb) = &self.on_model_loaded {
                        cb(summary);
                    }
                }
                self.notify_layer_selected();
            }
        }
        Ok(())
    }

    fn accepts_layers(&self) -> bool {
        match self.state {
            PipelineState::Parsing | PipelineState::LayersStreaming => true,
            state => {
                warn!("Layer data received in state {}, ignored", state);
                false
            }
        }
    }

    fn layers_received(&mut self, reached: f64) {
        self.state = PipelineState::LayersStreaming;
        if reached > self.parse_progress {
            self.parse_progress = reached;
            self.emit_progress(ProgressPhase::Parsing, reached);
        }
    }

    /// Handle every reply already queued, without waiting
    ///
    /// Returns the number of replies taken off the channel.
    pub fn pump(&mut self) -> Result<usize, PipelineError> {
        let mut handled = 0;
        loop {
            let Some(replies) = self.replies.as_mut() else {
                return Err(PipelineError::NotInitialized);
            };
            match replies.try_recv() {
                Ok(envelope) => {
                    self.handle(envelope)?;
                    handled += 1;
                }
                Err(TryRecvError::Empty) => return Ok(handled),
                Err(TryRecvError::Disconnected) => return Err(PipelineError::WorkerDisconnected),
            }
        }
    }

    /// Wait for replies until the current load is `Ready`
    pub async fn run_until_ready(&mut self) -> Result<(), PipelineError> {
        self.ensure_initialized()?;
        while self.state != PipelineState::Ready {
            if self.state == PipelineState::Idle {
                return Err(PipelineError::InvalidState {
                    expected: PipelineState::Parsing.to_string(),
                    actual: self.state.to_string(),
                });
            }
            let Some(replies) = self.replies.as_mut() else {
                return Err(PipelineError::NotInitialized);
            };
            let Some(envelope) = replies.recv().await else {
                return Err(PipelineError::WorkerDisconnected);
            };
            self.handle(envelope)?;
        }
        Ok(())
    }

    /// Post-process the streamed model, rebuild the index and draw layer 0
    fn pass_data_to_renderer(&mut self) {
        self.store.process(&self.config.reader);
        self.index = PercentageIndex::build(self.config.reader.index_strategy, self.store.layers());
        self.selected_layer = 0;
        self.render(0, None);
    }

    /// Re-run post-processing on the model already received
    fn recompute(&mut self) {
        self.recompute_count += 1;
        info!("Recomputing model ({})", self.recompute_count);
        self.pass_data_to_renderer();
        self.notify_layer_selected();
    }

    fn render(&mut self, layer: usize, clip: Option<CommandClip>) {
        self.geometry =
            GeometryBuilder::new(&self.config.renderer).build(self.store.layers(), layer, clip);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.draw(&self.geometry);
        }
    }

    /// Merge a host option map into the reader options
    ///
    /// Returns whether any recognized value changed. A changed
    /// post-processing option recomputes a `Ready` model in place.
    pub fn set_option(&mut self, options: &Value) -> Result<bool, ConfigError> {
        let mut reader = self.config.reader.clone();
        let change = merge_reader_options(&mut reader, options)?;
        if !change.changed {
            return Ok(false);
        }

        let candidate = ViewerConfig {
            reader,
            ..self.config.clone()
        };
        validate_config(&candidate)?;
        self.config = candidate;

        if change.recompute && self.state == PipelineState::Ready {
            self.recompute();
        }
        Ok(true)
    }

    /// Replace whole option sections
    pub fn update_options(&mut self, update: UpdateOptions) -> Result<(), ConfigError> {
        let mut candidate = self.config.clone();
        if let Some(ui) = update.ui {
            candidate.ui = ui;
        }
        if let Some(reader) = update.reader {
            candidate.reader = reader;
        }
        if let Some(renderer) = update.renderer {
            candidate.renderer = renderer;
        }
        validate_config(&candidate)?;

        let before = &self.config.reader;
        let post_processing_changed = before.sort_layers != candidate.reader.sort_layers
            || before.purge_empty_layers != candidate.reader.purge_empty_layers
            || before.index_strategy != candidate.reader.index_strategy;
        let renderer_changed = self.config.renderer != candidate.renderer;
        self.config = candidate;

        if self.state == PipelineState::Ready {
            if post_processing_changed {
                self.recompute();
            } else if renderer_changed {
                self.render(self.selected_layer, None);
            }
        }
        Ok(())
    }

    /// Draw layers `0..=layer`
    pub fn change_selected_layer(&mut self, layer: usize) -> Result<(), PipelineError> {
        self.ensure_ready()?;
        let available = self.store.layers().len();
        if layer >= available {
            return Err(PipelineError::LayerNotFound { layer, available });
        }
        self.selected_layer = layer;
        self.render(layer, None);
        self.notify_layer_selected();
        Ok(())
    }

    /// Redraw the selected layers with `layer` clipped to `first..=last`
    pub fn change_selected_commands(
        &mut self,
        layer: usize,
        first: usize,
        last: usize,
    ) -> Result<(), PipelineError> {
        self.ensure_ready()?;
        let available = self.store.layers().len();
        let Some(len) = self.store.layer(layer).map(|l| l.len()) else {
            return Err(PipelineError::LayerNotFound { layer, available });
        };
        if first > last || last >= len {
            return Err(PipelineError::CommandRangeOutOfBounds {
                layer,
                first,
                last,
                len,
            });
        }
        if layer != self.selected_layer {
            self.selected_layer = layer;
            self.notify_layer_selected();
        }
        self.render(layer, Some(CommandClip { first, last }));
        Ok(())
    }

    /// Locate the command at a progress percentage
    ///
    /// `None` (progress unknown) repeats the previous answer. With
    /// `followProgress` on, the located layer becomes the selected one.
    pub fn cmd_index_for_percentage(&mut self, percentage: Option<f64>) -> Option<Locator> {
        let found = self.index.find(percentage)?;
        if self.config.ui.follow_progress
            && self.state == PipelineState::Ready
            && found.layer != self.selected_layer
        {
            self.selected_layer = found.layer;
            self.render(found.layer, None);
            self.notify_layer_selected();
        }
        Some(found)
    }

    /// Aggregate analysis; `None` until `analyzeDone`
    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.store.info()
    }

    /// Filament used by the layer at height `z`
    pub fn layer_filament(&self, z: f64) -> Option<f64> {
        self.store.layer_filament(z)
    }

    /// Feed rates seen on the layer at height `z`
    pub fn layer_speeds(&self, z: f64) -> Option<&SpeedSet> {
        self.store.layer_speeds(z)
    }

    /// Current phase of the load
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Token stamped on requests of the current load
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Streamed and post-processed layers
    pub fn model(&self) -> &ModelStore {
        &self.store
    }

    /// Geometry of the last render pass
    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    /// Options in effect, after init overrides and capability fallbacks
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Mode chosen from the GPU capability at `init`
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Topmost drawn layer
    pub fn selected_layer(&self) -> usize {
        self.selected_layer
    }

    /// Number of in-place recomputes since creation
    pub fn recompute_count(&self) -> usize {
        self.recompute_count
    }

    /// Summary passed to `on_model_loaded`; `None` until `analyzeDone`
    pub fn summary(&self) -> Option<ModelSummary> {
        let info = self.store.info()?;
        Some(ModelSummary {
            layer_count: self.store.layers().len(),
            command_count: self.store.command_count(),
            model_size: info.model_size,
            total_filament: info.total_filament,
            print_time: info.print_time,
            layer_height: info.layer_height,
        })
    }

    /// Details of a processed layer, with its aggregates looked up by Z
    pub fn layer_info(&self, index: usize) -> Option<LayerInfo> {
        let layer = self.store.layer(index)?;
        Some(LayerInfo {
            index,
            source_number: layer.source_number,
            z: layer.z,
            command_count: layer.len(),
            filament: self.store.layer_filament(layer.z),
            speeds: self.store.layer_speeds(layer.z).cloned(),
        })
    }

    fn emit_progress(&self, phase: ProgressPhase, percent: f64) {
        if let Some(cb) = &self.on_progress {
            cb(phase, percent);
        }
    }

    fn notify_layer_selected(&self) {
        let Some(cb) = &self.on_layer_selected else {
            return;
        };
        if let Some(info) = self.layer_info(self.selected_layer) {
            cb(info);
        }
    }
}
