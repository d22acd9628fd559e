//! Configuration structures for the feedback engine

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub analysis: AnalysisConfig,
    pub feedback: FeedbackConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audio.validate()?;
        self.analysis.validate()?;
        self.feedback.validate()?;
        Ok(())
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate the pipeline analyzes at (Hz)
    pub sample_rate: u32,
    /// Samples per analysis frame
    pub frame_size: usize,
    /// Audio device name (None = default device)
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_size: 512,
            device: None,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("audio.sample_rate", self.sample_rate));
        }
        if self.frame_size == 0 {
            return Err(ConfigError::invalid("audio.frame_size", self.frame_size));
        }
        Ok(())
    }

    /// Wall-clock duration covered by one frame
    pub fn frame_duration(&self) -> Duration {
        let nanos = (self.frame_size as u64).saturating_mul(1_000_000_000);
        Duration::from_nanos(nanos / self.sample_rate.max(1) as u64)
    }
}

/// LPC analysis and spectrum shaping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// LPC predictor order
    pub lpc_order: usize,
    /// Highest frequency covered by the envelope evaluation (Hz)
    pub max_lpc_freq: f64,
    /// Number of bins the all-pole response is evaluated at
    pub lpc_display_res: usize,
    /// Length of the expanded spectrum handed to the renderer
    pub display_resolution: usize,
    /// Sensitivity, 0 - 100
    pub sensitivity: f64,
    /// Fraction of the gap closed per frame when rising
    pub attack_rate: f64,
    /// Fraction of the gap closed per frame when falling
    pub decay_rate: f64,
    /// Width of the hold band around the target value
    pub dead_zone: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lpc_order: 64,
            max_lpc_freq: 4096.0,
            lpc_display_res: 64,
            display_resolution: 512,
            sensitivity: 60.0,
            attack_rate: 0.03,
            decay_rate: 0.03,
            dead_zone: 0.001,
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.lpc_order == 0 {
            return Err(ConfigError::invalid("analysis.lpc_order", self.lpc_order));
        }
        if !(self.max_lpc_freq > 0.0) {
            return Err(ConfigError::invalid("analysis.max_lpc_freq", self.max_lpc_freq));
        }
        if self.lpc_display_res == 0 {
            return Err(ConfigError::invalid(
                "analysis.lpc_display_res",
                self.lpc_display_res,
            ));
        }
        // Each envelope bin must expand to at least one display point
        if self.display_resolution == 0 || self.display_resolution < self.lpc_display_res {
            return Err(ConfigError::invalid(
                "analysis.display_resolution",
                self.display_resolution,
            ));
        }
        if !(0.0..=100.0).contains(&self.sensitivity) {
            return Err(ConfigError::invalid("analysis.sensitivity", self.sensitivity));
        }
        if !(0.0..=1.0).contains(&self.attack_rate) {
            return Err(ConfigError::invalid("analysis.attack_rate", self.attack_rate));
        }
        if !(0.0..=1.0).contains(&self.decay_rate) {
            return Err(ConfigError::invalid("analysis.decay_rate", self.decay_rate));
        }
        if !(self.dead_zone >= 0.0) {
            return Err(ConfigError::invalid("analysis.dead_zone", self.dead_zone));
        }
        Ok(())
    }
}

/// Target alignment and haptic feedback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Frequency the third resonance should reach (Hz)
    pub target_frequency: f64,
    /// Frequency mapped to the right edge of the display (Hz)
    pub max_frequency: f64,
    /// Allowed distance between peak and target, as a fraction of the range
    pub tolerance: f64,
    /// Minimum time between two haptic cues (ms)
    pub debounce_ms: u64,
    /// Length of one haptic pulse (ms)
    pub pulse_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            target_frequency: SpeakerSex::Male.target_frequency(),
            max_frequency: 4600.0,
            tolerance: 0.08,
            debounce_ms: 500,
            pulse_ms: 50,
        }
    }
}

impl FeedbackConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_frequency > 0.0) {
            return Err(ConfigError::invalid(
                "feedback.target_frequency",
                self.target_frequency,
            ));
        }
        if !(self.max_frequency > 0.0) {
            return Err(ConfigError::invalid("feedback.max_frequency", self.max_frequency));
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::invalid("feedback.tolerance", self.tolerance));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

/// Drawing surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 150.0,
        }
    }
}

/// Speaker sex, used to pick the default target frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerSex {
    Male,
    Female,
}

impl SpeakerSex {
    pub fn target_frequency(self) -> f64 {
        match self {
            SpeakerSex::Male => 1700.0,
            SpeakerSex::Female => 2000.0,
        }
    }
}

impl std::fmt::Display for SpeakerSex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeakerSex::Male => write!(f, "male"),
            SpeakerSex::Female => write!(f, "female"),
        }
    }
}

impl std::str::FromStr for SpeakerSex {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(SpeakerSex::Male),
            "female" | "f" => Ok(SpeakerSex::Female),
            other => Err(ConfigError::invalid("speaker_sex", other)),
        }
    }
}

/// Output format for offline frame reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human readable, one line per frame
    Text,
    /// JSON lines
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}
