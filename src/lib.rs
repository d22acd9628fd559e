//! Rhotic Feedback Engine
//!
//! Real-time acoustic feedback for "R" sound practice. Microphone frames are
//! turned into an LPC spectral envelope of the vocal tract, its resonance
//! peaks are located, and a haptic cue fires whenever the third resonance
//! lines up with the target frequency.
//!
//! # Architecture
//!
//! - `audio`: frame assembly and frame sources (microphone, WAV, memory)
//! - `analysis`: preprocessing, LPC, envelope, smoothing and peak picking
//! - `feedback`: target alignment, debounce and haptic cue delivery
//! - `render`: canvas abstraction, spectrum renderer and render scheduling
//! - `session`: the idle/recording lifecycle and analysis worker
//! - `output`: per-frame reports for offline analysis
//! - `config`: configuration structures
//! - `error`: error types
//!
//! # Example
//!
//! ```no_run
//! use rhotic_feedback::{Config, MicrophoneSource, Session};
//!
//! let config = Config::default();
//!
//! let mut source = MicrophoneSource::new(config.audio.clone());
//! source.init().unwrap();
//!
//! let mut session = Session::new(source, &config);
//! session.start().unwrap();
//! // ... read snapshots through session.display_link()
//! session.stop();
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod feedback;
pub mod output;
pub mod render;
pub mod session;

// Re-exports for convenience
pub use analysis::{FrameAnalysis, ProcessorState, SpectralProcessor, SpectrumSnapshot};
pub use audio::{Frame, FrameSource, MemorySource, MicrophoneSource};
pub use config::{
    AnalysisConfig, AudioConfig, Config, FeedbackConfig, RenderConfig, ReportFormat, SpeakerSex,
};
pub use error::{CaptureError, ConfigError, FeedbackError, Result};
pub use feedback::{
    Alignment, ChannelHapticSink, Clock, HapticCue, HapticSink, ManualClock, SystemClock,
};
pub use output::{FrameReport, ReportWriter};
pub use render::{DisplayLink, SpectrumDisplay, SvgCanvas, WaveformRenderer};
pub use session::{Session, SessionState};
