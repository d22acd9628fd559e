//! Recording session: owns the frame source and the analysis worker
//!
//! A session moves `Idle -> Recording -> Idle`. Starting acquires the source
//! first and spawns the worker only once that succeeded; stopping (explicitly
//! or on drop) joins the worker, releases the source and clears everything
//! the display could still show.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{ProcessorState, SpectralProcessor};
use crate::audio::{Frame, FrameSource};
use crate::config::{AnalysisConfig, Config, FeedbackConfig, SpeakerSex};
use crate::error::{FeedbackError, Result};
use crate::feedback::{Clock, HapticCue, HapticSink, NullHapticSink, SharedTarget, SystemClock};
use crate::render::DisplayLink;

/// How long the worker waits for a frame before re-checking the running flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
}

/// Counters updated by the worker
#[derive(Debug, Default)]
pub struct SessionStats {
    frames: AtomicU64,
    cues: AtomicU64,
}

impl SessionStats {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn cues(&self) -> u64 {
        self.cues.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.frames.store(0, Ordering::Relaxed);
        self.cues.store(0, Ordering::Relaxed);
    }
}

/// Everything the worker thread needs, moved in on start
struct Worker {
    processor: SpectralProcessor,
    state: ProcessorState,
    target: Arc<SharedTarget>,
    link: DisplayLink,
    haptic: Arc<dyn HapticSink>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    pulse: Duration,
}

impl Worker {
    fn run(mut self, frames: Receiver<Frame>) {
        debug!("Analysis worker started");

        while self.running.load(Ordering::Relaxed) {
            match frames.recv_timeout(POLL_INTERVAL) {
                Ok(frame) => self.handle(&frame),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Frame source finished");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        debug!(
            "Analysis worker exiting after {} frames",
            self.state.frames()
        );
    }

    fn handle(&mut self, frame: &Frame) {
        if frame.sample_rate() != self.processor.sample_rate() {
            warn!(
                "Dropping frame at {} Hz, expected {} Hz",
                frame.sample_rate(),
                self.processor.sample_rate()
            );
            return;
        }

        self.processor.set_target_frequency(self.target.get());

        let now = self.clock.now();
        let analysis = self.processor.process(frame, &mut self.state, now);

        if analysis.alignment.fired() {
            self.stats.cues.fetch_add(1, Ordering::Relaxed);
            self.haptic.trigger(HapticCue {
                at: now,
                pulse: self.pulse,
            });
        }

        self.stats.frames.fetch_add(1, Ordering::Relaxed);
        self.link.publish(analysis.snapshot);
    }
}

/// Live feedback session over a [`FrameSource`]
pub struct Session<S: FrameSource> {
    source: S,
    analysis: AnalysisConfig,
    feedback: FeedbackConfig,
    state: SessionState,
    target: Arc<SharedTarget>,
    link: DisplayLink,
    haptic: Arc<dyn HapticSink>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    worker: Option<JoinHandle<()>>,
}

impl<S: FrameSource> Session<S> {
    /// Create an idle session with a wall clock and no haptic output
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            analysis: config.analysis.clone(),
            target: Arc::new(SharedTarget::new(config.feedback.target_frequency)),
            feedback: config.feedback.clone(),
            state: SessionState::Idle,
            link: DisplayLink::new(),
            haptic: Arc::new(NullHapticSink),
            clock: Arc::new(SystemClock),
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SessionStats::default()),
            worker: None,
        }
    }

    pub fn with_haptic_sink(mut self, sink: Arc<dyn HapticSink>) -> Self {
        self.haptic = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the worker is still consuming frames
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Handles for a display to read snapshots from
    pub fn display_link(&self) -> DisplayLink {
        self.link.clone()
    }

    pub fn target_frequency(&self) -> f64 {
        self.target.get()
    }

    /// Takes effect from the next analyzed frame
    pub fn set_target_frequency(&self, frequency: f64) {
        info!("Target frequency set to {} Hz", frequency);
        self.target.set(frequency);
    }

    pub fn set_speaker_sex(&self, sex: SpeakerSex) {
        debug!("Speaker sex: {}", sex);
        self.set_target_frequency(sex.target_frequency());
    }

    /// Acquire the source and start analyzing
    pub fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Recording {
            return Err(FeedbackError::Session("already recording".to_string()));
        }

        let frames = self.source.start().map_err(|e| {
            warn!("Failed to start frame source: {}", e);
            FeedbackError::from(e)
        })?;

        let sample_rate = self.source.sample_rate();
        let processor = SpectralProcessor::new(&self.analysis, &self.feedback, sample_rate);
        let state = ProcessorState::new(&self.feedback);
        info!(
            "Analysis: LPC order {}, debounce {:?}",
            processor.order(),
            state.debouncer.interval()
        );

        let worker = Worker {
            processor,
            state,
            target: self.target.clone(),
            link: self.link.clone(),
            haptic: self.haptic.clone(),
            clock: self.clock.clone(),
            running: self.running.clone(),
            stats: self.stats.clone(),
            pulse: self.feedback.pulse(),
        };

        self.stats.reset();
        self.running.store(true, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name("rhotic-analysis".to_string())
            .spawn(move || worker.run(frames));

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::Relaxed);
                self.source.stop();
                return Err(FeedbackError::Io(e));
            }
        }

        self.state = SessionState::Recording;
        info!(
            "Recording started: {} Hz, {} samples per frame, target {} Hz",
            sample_rate,
            self.source.frame_size(),
            self.target.get()
        );
        Ok(())
    }

    /// Block until a finite source has been fully analyzed
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Analysis worker panicked");
            }
        }
    }

    /// Stop analyzing, release the source and clear the display. Idempotent.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }

        self.running.store(false, Ordering::Relaxed);
        self.wait();
        self.source.stop();
        self.link.clear();
        self.state = SessionState::Idle;

        info!(
            "Recording stopped: {} frames analyzed, {} cues",
            self.stats.frames(),
            self.stats.cues()
        );
    }
}

impl<S: FrameSource> Drop for Session<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
