//! LPC spectral-envelope pipeline
//!
//! One call to [`SpectralProcessor::process`] takes a frame through every
//! stage: conditioning, autocorrelation, Levinson-Durbin, all-pole response,
//! expansion, scaling, smoothing, normalization, peak picking and the
//! third-peak alignment check. Everything that must survive between frames
//! lives in [`ProcessorState`], which the caller owns and passes in.

pub mod envelope;
pub mod lpc;
pub mod peaks;
pub mod preprocess;
pub mod shaping;

use std::time::Instant;
use tracing::{debug, trace};

use crate::audio::Frame;
use crate::config::{AnalysisConfig, FeedbackConfig};
use crate::feedback::{Alignment, AlignmentDetector, Debouncer, TargetBand};

pub use envelope::AngleTable;
pub use preprocess::DcBlocker;
pub use shaping::Smoother;

/// Spectrum and peaks published once per analyzed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumSnapshot {
    /// Frame counter since the processor state was created or reset
    pub sequence: u64,
    pub magnitudes: Vec<f64>,
    pub peaks: Vec<usize>,
}

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    pub snapshot: SpectrumSnapshot,
    pub alignment: Alignment,
}

/// Mutable state carried from one frame to the next
#[derive(Debug, Clone)]
pub struct ProcessorState {
    /// Last published spectrum; empty before the first frame
    pub previous: Vec<f64>,
    pub dc_blocker: DcBlocker,
    pub debouncer: Debouncer,
    angle_table: Option<AngleTable>,
    window: Vec<f64>,
    frames: u64,
}

impl ProcessorState {
    pub fn new(feedback: &FeedbackConfig) -> Self {
        Self {
            previous: Vec::new(),
            dc_blocker: DcBlocker::new(),
            debouncer: Debouncer::new(feedback.debounce()),
            angle_table: None,
            window: Vec::new(),
            frames: 0,
        }
    }

    /// Number of frames processed with this state
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn angle_table(&self) -> Option<&AngleTable> {
        self.angle_table.as_ref()
    }
}

/// Fixed-parameter pipeline; holds no per-frame state of its own
#[derive(Debug, Clone)]
pub struct SpectralProcessor {
    config: AnalysisConfig,
    sample_rate: u32,
    smoother: Smoother,
    detector: AlignmentDetector,
}

impl SpectralProcessor {
    pub fn new(config: &AnalysisConfig, feedback: &FeedbackConfig, sample_rate: u32) -> Self {
        debug!(
            "Spectral processor: order={}, {} Hz, {} bins -> {} display, sensitivity={}",
            config.lpc_order,
            sample_rate,
            config.lpc_display_res,
            config.display_resolution,
            config.sensitivity
        );

        Self {
            smoother: Smoother::new(config.attack_rate, config.decay_rate, config.dead_zone),
            detector: AlignmentDetector::new(TargetBand::from(feedback)),
            config: config.clone(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn order(&self) -> usize {
        self.config.lpc_order
    }

    pub fn target_band(&self) -> &TargetBand {
        self.detector.band()
    }

    pub fn set_target_frequency(&mut self, frequency: f64) {
        if self.detector.band().target_frequency != frequency {
            debug!("Target frequency -> {} Hz", frequency);
            self.detector.set_target_frequency(frequency);
        }
    }

    /// Predictor polynomial for one frame; updates the DC blocker memory
    pub fn coefficients(&self, samples: &[f32], state: &mut ProcessorState) -> Vec<f64> {
        if state.window.len() != samples.len() {
            state.window = preprocess::raised_cosine_window(samples.len());
        }
        let processed = preprocess::preprocess(samples, &state.window, &mut state.dc_blocker);
        lpc::predictor_coefficients(&processed, self.config.lpc_order)
    }

    /// Raw log-magnitude envelope at `lpc_display_res` bins
    pub fn envelope(&self, coeffs: &[f64], state: &mut ProcessorState) -> Vec<f64> {
        let table = state.angle_table.get_or_insert_with(|| {
            AngleTable::new(
                self.sample_rate,
                self.config.max_lpc_freq,
                self.config.lpc_display_res,
            )
        });
        envelope::frequency_response(coeffs, table)
    }

    /// Expanded, scaled, smoothed and normalized display spectrum.
    ///
    /// Stores the result as the next frame's smoothing reference.
    pub fn shape(&self, raw: &[f64], state: &mut ProcessorState) -> Vec<f64> {
        let mut magnitudes = shaping::expand(raw, self.config.display_resolution);
        shaping::scale(&mut magnitudes, self.config.sensitivity);

        if !state.previous.is_empty() {
            magnitudes = self.smoother.apply(&state.previous, &magnitudes);
        }
        shaping::normalize(&mut magnitudes);

        state.previous.clone_from(&magnitudes);
        magnitudes
    }

    /// Run the whole chain for one frame
    pub fn process(&self, frame: &Frame, state: &mut ProcessorState, now: Instant) -> FrameAnalysis {
        let coeffs = self.coefficients(frame.samples(), state);
        let raw = self.envelope(&coeffs, state);
        let magnitudes = self.shape(&raw, state);
        let peaks = peaks::find_peaks(&magnitudes);

        let alignment =
            self.detector
                .check(&peaks, magnitudes.len(), &mut state.debouncer, now);

        state.frames += 1;
        trace!(
            "Frame {}: {} bins, peaks={:?}, {:?}",
            state.frames,
            magnitudes.len(),
            peaks,
            alignment
        );

        FrameAnalysis {
            snapshot: SpectrumSnapshot {
                sequence: state.frames,
                magnitudes,
                peaks,
            },
            alignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;

    fn processor(config: &Config) -> SpectralProcessor {
        SpectralProcessor::new(&config.analysis, &config.feedback, config.audio.sample_rate)
    }

    fn vowel_frame(len: usize, sample_rate: u32, offset: usize) -> Frame {
        let formants = [(500.0, 1.0), (1500.0, 0.6), (2500.0, 0.4)];
        let samples = (0..len)
            .map(|i| {
                let t = (i + offset) as f32 / sample_rate as f32;
                formants
                    .iter()
                    .map(|&(f, a)| a * (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum::<f32>()
                    * 0.3
            })
            .collect();
        Frame::new(samples, sample_rate)
    }

    #[test]
    fn test_silent_frame_is_flat_zero() {
        let config = Config::default();
        let processor = processor(&config);
        let mut state = ProcessorState::new(&config.feedback);

        let frame = Frame::silent(512, 44100);
        let coeffs = processor.coefficients(frame.samples(), &mut state);
        assert_eq!(coeffs.len(), 65);
        assert_eq!(coeffs[0], 1.0);
        assert!(coeffs[1..].iter().all(|&c| c == 0.0));

        let result = processor.process(&frame, &mut state, Instant::now());
        assert_eq!(result.snapshot.magnitudes.len(), 512);
        assert!(result
            .snapshot
            .magnitudes
            .iter()
            .all(|&v| v.is_finite() && v.abs() < 1e-9));
        assert!(result.snapshot.peaks.is_empty());
        assert_eq!(result.alignment, Alignment::NoTargetPeak);
    }

    #[test]
    fn test_first_frame_bypasses_smoothing() {
        let config = Config::default();
        let processor = processor(&config);
        let mut state = ProcessorState::new(&config.feedback);
        let frame = vowel_frame(512, 44100, 0);

        // Compute the unsmoothed expectation with a throwaway state
        let mut scratch = ProcessorState::new(&config.feedback);
        let coeffs = processor.coefficients(frame.samples(), &mut scratch);
        let raw = processor.envelope(&coeffs, &mut scratch);
        let mut expected = shaping::expand(&raw, 512);
        shaping::scale(&mut expected, 60.0);
        shaping::normalize(&mut expected);

        let result = processor.process(&frame, &mut state, Instant::now());
        assert_eq!(result.snapshot.magnitudes, expected);
        assert_eq!(state.previous, expected);
        assert_eq!(result.snapshot.sequence, 1);
    }

    #[test]
    fn test_second_frame_is_smoothed() {
        let config = Config::default();
        let processor = processor(&config);
        let mut state = ProcessorState::new(&config.feedback);

        processor.process(&Frame::silent(512, 44100), &mut state, Instant::now());
        let first = state.previous.clone();

        // Silence leaves the DC blocker at rest, so a fresh state sees the same input
        let frame = vowel_frame(512, 44100, 0);
        let mut scratch = ProcessorState::new(&config.feedback);
        let coeffs = processor.coefficients(frame.samples(), &mut scratch);
        let raw = processor.envelope(&coeffs, &mut scratch);
        let mut target = shaping::expand(&raw, 512);
        shaping::scale(&mut target, 60.0);
        let smoother = Smoother::new(0.03, 0.03, 0.001);
        let mut expected = smoother.apply(&first, &target);
        shaping::normalize(&mut expected);

        let result = processor.process(&frame, &mut state, Instant::now());
        assert_eq!(result.snapshot.magnitudes, expected);
        assert_ne!(result.snapshot.magnitudes, target);
    }

    #[test]
    fn test_angle_table_cached_once() {
        let config = Config::default();
        let processor = processor(&config);
        let mut state = ProcessorState::new(&config.feedback);
        assert!(state.angle_table().is_none());

        processor.process(&vowel_frame(512, 44100, 0), &mut state, Instant::now());
        let table = state.angle_table().cloned();
        processor.process(&vowel_frame(512, 44100, 512), &mut state, Instant::now());
        assert_eq!(state.angle_table().cloned(), table);
        assert_eq!(state.frames(), 2);
    }

    #[test]
    fn test_voiced_frames_stay_finite_and_bounded() {
        let config = Config::default();
        let processor = processor(&config);
        let mut state = ProcessorState::new(&config.feedback);
        let mut now = Instant::now();

        for k in 0..20 {
            let result = processor.process(&vowel_frame(512, 44100, k * 512), &mut state, now);
            let mags = &result.snapshot.magnitudes;
            assert_eq!(mags.len(), 512);
            assert!(mags.iter().all(|v| v.is_finite()));
            assert!(mags.iter().copied().fold(f64::NEG_INFINITY, f64::max) <= 1.0);
            for w in result.snapshot.peaks.windows(2) {
                assert!(w[0] < w[1]);
            }
            now += Duration::from_millis(12);
        }
        assert_eq!(state.frames(), 20);
    }

    #[test]
    fn test_retarget() {
        let config = Config::default();
        let mut processor = processor(&config);
        processor.set_target_frequency(2000.0);
        assert_eq!(processor.target_band().target_frequency, 2000.0);
        assert_eq!(processor.order(), 64);

        let mut state = ProcessorState::new(&config.feedback);
        let result = processor.process(&vowel_frame(512, 44100, 0), &mut state, Instant::now());
        assert_eq!(result.snapshot.magnitudes.len(), 512);
    }
}
