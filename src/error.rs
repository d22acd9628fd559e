//! Error types for the rhotic feedback engine
//!
//! Only the capture lifecycle and configuration loading can fail. The analysis
//! path never returns an error: degenerate input falls back to flat spectra.

use thiserror::Error;

/// Main error type for the feedback engine
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Session error: {0}")]
    Session(String),
}

/// Capture-device lifecycle errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get device configuration: {0}")]
    DeviceConfig(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("Stream playback error: {0}")]
    StreamPlay(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: impl ToString) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
