//! Spectrum display: drawing surface, renderer and render scheduling

pub mod canvas;
pub mod snapshot;
pub mod waveform;

use tracing::debug;

pub use canvas::{Canvas, Color, DrawCommand, RecordingCanvas, SvgCanvas};
pub use snapshot::{DisplayLink, RenderScheduler, SnapshotCell};
pub use waveform::WaveformRenderer;

/// Binds a renderer to the snapshots published by a session.
///
/// The owner calls [`SpectrumDisplay::tick`] from its frame clock; a render
/// only happens when something changed since the previous tick.
#[derive(Debug)]
pub struct SpectrumDisplay {
    renderer: WaveformRenderer,
    link: DisplayLink,
}

impl SpectrumDisplay {
    /// Requests an initial render so the target line shows before any audio
    pub fn new(renderer: WaveformRenderer, link: DisplayLink) -> Self {
        link.scheduler.request();
        Self { renderer, link }
    }

    pub fn renderer(&self) -> &WaveformRenderer {
        &self.renderer
    }

    /// Render the latest snapshot if a render is pending
    pub fn tick(&self, canvas: &mut dyn Canvas) -> bool {
        self.link.scheduler.run_pending(|| {
            let snapshot = self.link.cell.latest();
            self.renderer.render(canvas, snapshot.as_deref());
        })
    }

    /// Render unconditionally, e.g. for a one-off export
    pub fn render_now(&self, canvas: &mut dyn Canvas) {
        let snapshot = self.link.cell.latest();
        self.renderer.render(canvas, snapshot.as_deref());
    }

    pub fn set_target_frequency(&mut self, frequency: f64) {
        self.renderer.set_target_frequency(frequency);
        self.link.scheduler.request();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.renderer.resize(width, height);
        self.link.scheduler.request();
    }

    pub fn start_rendering(&self) {
        debug!("Rendering started");
        self.link.scheduler.start();
        self.link.scheduler.request();
    }

    pub fn stop_rendering(&self) {
        debug!("Rendering stopped");
        self.link.scheduler.stop();
    }
}
