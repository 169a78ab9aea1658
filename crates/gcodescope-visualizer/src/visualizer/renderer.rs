//! Renderer seam
//!
//! The rasterizing backend is supplied by the host. The pipeline only tells
//! it which mode to run in and hands it finished geometry.

use gcodescope_core::{thread_safe, ThreadSafe};
use tracing::trace;

use super::geometry::SceneGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// GPU-accelerated drawing
    #[default]
    Accelerated,
    /// Software line rasterization
    Software,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accelerated => write!(f, "accelerated"),
            Self::Software => write!(f, "software"),
        }
    }
}

pub trait LineRenderer: Send {
    fn set_mode(&mut self, mode: RenderMode);

    fn mode(&self) -> RenderMode;

    /// Replace whatever was drawn before with this geometry
    fn draw(&mut self, scene: &SceneGeometry);
}

/// What a `RecordingRenderer` has been asked to do
#[derive(Debug, Clone, Default)]
pub struct RendererLog {
    pub mode: RenderMode,
    pub frames_drawn: usize,
    pub last: Option<SceneGeometry>,
}

/// Renderer that keeps the last frame instead of rasterizing it
///
/// The log is shared, so a host can keep a handle after boxing the renderer
/// into the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: ThreadSafe<RendererLog>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            log: thread_safe(RendererLog::default()),
        }
    }

    pub fn log(&self) -> ThreadSafe<RendererLog> {
        self.log.clone()
    }
}

impl LineRenderer for RecordingRenderer {
    fn set_mode(&mut self, mode: RenderMode) {
        self.log.lock().mode = mode;
    }

    fn mode(&self) -> RenderMode {
        self.log.lock().mode
    }

    fn draw(&mut self, scene: &SceneGeometry) {
        trace!("Recording frame with {} segments", scene.segments.len());
        let mut log = self.log.lock();
        log.frames_drawn += 1;
        log.last = Some(scene.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_shared_with_host() {
        let renderer = RecordingRenderer::new();
        let log = renderer.log();
        let mut boxed: Box<dyn LineRenderer> = Box::new(renderer);

        boxed.set_mode(RenderMode::Software);
        boxed.draw(&SceneGeometry::default());
        boxed.draw(&SceneGeometry::default());

        let log = log.lock();
        assert_eq!(log.mode, RenderMode::Software);
        assert_eq!(log.frames_drawn, 2);
        assert!(log.last.is_some());
    }
}
