//! Frame sources: the capture abstraction and its cpal microphone implementation

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Host, Sample, SampleRate, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::frame::{Frame, FrameAssembler};
use crate::config::AudioConfig;
use crate::error::CaptureError;

/// Number of frames buffered between the device callback and the analysis
const FRAME_QUEUE_DEPTH: usize = 100;

/// Anything that can deliver fixed-size frames at a fixed sample rate.
///
/// `start` hands back the receiving end of the frame channel; the source keeps
/// whatever resource produces the frames until `stop` is called. A source whose
/// sender is dropped signals end of input by disconnecting the channel.
pub trait FrameSource {
    /// Acquire the underlying resource and begin delivering frames
    fn start(&mut self) -> Result<Receiver<Frame>, CaptureError>;

    /// Release the underlying resource. Must be safe to call repeatedly.
    fn stop(&mut self);

    /// Sample rate of the frames this source delivers
    fn sample_rate(&self) -> u32;

    /// Samples per delivered frame
    fn frame_size(&self) -> usize;

    fn is_running(&self) -> bool;
}

/// Microphone capture through the default cpal host
pub struct MicrophoneSource {
    config: AudioConfig,
    host: Host,
    device: Option<Device>,
    supported: Option<cpal::SupportedStreamConfig>,
    stream: Option<Stream>,
    is_running: Arc<AtomicBool>,
    actual_sample_rate: u32,
}

impl MicrophoneSource {
    /// Create a new, uninitialized microphone source
    pub fn new(config: AudioConfig) -> Self {
        Self {
            actual_sample_rate: config.sample_rate,
            config,
            host: cpal::default_host(),
            device: None,
            supported: None,
            stream: None,
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// List available audio input devices
    pub fn list_devices(&self) -> Result<Vec<String>, CaptureError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceConfig(e.to_string()))?;

        Ok(devices.filter_map(|device| device.name().ok()).collect())
    }

    /// Open the configured device and pick a stream configuration
    pub fn init(&mut self) -> Result<(), CaptureError> {
        let device = if let Some(ref device_name) = self.config.device {
            self.find_device_by_name(device_name)?
        } else {
            self.host
                .default_input_device()
                .ok_or(CaptureError::NoInputDevice)?
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio input device: {}", device_name);

        let supported_configs = device
            .supported_input_configs()
            .map_err(map_config_error)?;

        // Prefer the target rate, then f32 samples, then fewer channels
        let target_rate = SampleRate(self.config.sample_rate);
        let mut best: Option<cpal::SupportedStreamConfig> = None;
        let mut best_score = i32::MIN;
        for range in supported_configs {
            debug!(
                "Supported config: channels={}, sample_rate={:?}-{:?}, format={:?}",
                range.channels(),
                range.min_sample_rate(),
                range.max_sample_rate(),
                range.sample_format()
            );

            let rate_fits =
                range.min_sample_rate() <= target_rate && target_rate <= range.max_sample_rate();
            let mut score = 0;
            if rate_fits {
                score += 4;
            }
            if range.sample_format() == cpal::SampleFormat::F32 {
                score += 2;
            }
            if range.channels() == 1 {
                score += 1;
            }

            if score > best_score {
                best_score = score;
                best = Some(if rate_fits {
                    range.with_sample_rate(target_rate)
                } else {
                    range.with_max_sample_rate()
                });
            }
        }

        let supported = best.ok_or_else(|| {
            CaptureError::DeviceConfig("No suitable audio configuration found".to_string())
        })?;

        self.actual_sample_rate = supported.sample_rate().0;
        info!(
            "Audio config: {} channels @ {} Hz (target: {} Hz), {:?}",
            supported.channels(),
            self.actual_sample_rate,
            self.config.sample_rate,
            supported.sample_format()
        );

        self.device = Some(device);
        self.supported = Some(supported);
        Ok(())
    }

    fn find_device_by_name(&self, name: &str) -> Result<Device, CaptureError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceConfig(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name.contains(name) {
                    return Ok(device);
                }
            }
        }

        Err(CaptureError::DeviceNotFound(name.to_string()))
    }

    fn build_stream<T>(
        &self,
        device: &Device,
        config: &StreamConfig,
        sender: Sender<Frame>,
    ) -> Result<Stream, CaptureError>
    where
        T: Sample + SizedSample,
        f32: FromSample<T>,
    {
        let channels = config.channels as usize;
        let is_running = self.is_running.clone();
        let mut assembler = FrameAssembler::new(self.config.frame_size, self.actual_sample_rate);

        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !is_running.load(Ordering::Relaxed) {
                        return;
                    }

                    // Mix down to mono
                    let mono: Vec<f32> = data
                        .chunks(channels.max(1))
                        .map(|chunk| {
                            chunk.iter().map(|s| s.to_sample::<f32>()).sum::<f32>()
                                / chunk.len() as f32
                        })
                        .collect();

                    for frame in assembler.push(&mono) {
                        if sender.try_send(frame).is_err() {
                            warn!("Frame queue overflow - dropping frame");
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(map_build_error)
    }
}

impl FrameSource for MicrophoneSource {
    fn start(&mut self) -> Result<Receiver<Frame>, CaptureError> {
        if self.device.is_none() {
            self.init()?;
        }
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| CaptureError::DeviceConfig("Device not initialized".to_string()))?;
        let supported = self
            .supported
            .as_ref()
            .ok_or_else(|| CaptureError::DeviceConfig("Device not initialized".to_string()))?;

        let config: StreamConfig = supported.config();
        let (sender, receiver) = bounded(FRAME_QUEUE_DEPTH);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(device, &config, sender)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(device, &config, sender)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(device, &config, sender)?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
        };

        // Flag before play so the first callback is not discarded
        self.is_running.store(true, Ordering::Relaxed);
        if let Err(e) = stream.play() {
            self.is_running.store(false, Ordering::Relaxed);
            return Err(CaptureError::StreamPlay(e.to_string()));
        }

        self.stream = Some(stream);
        info!("Audio capture started");
        Ok(receiver)
    }

    fn stop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if self.stream.take().is_some() {
            info!("Audio capture stopped");
        }
    }

    fn sample_rate(&self) -> u32 {
        self.actual_sample_rate
    }

    fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn map_config_error(err: cpal::SupportedStreamConfigsError) -> CaptureError {
    match err {
        cpal::SupportedStreamConfigsError::DeviceNotAvailable => CaptureError::NoInputDevice,
        other => CaptureError::DeviceConfig(other.to_string()),
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoInputDevice,
        cpal::BuildStreamError::BackendSpecific { err } => {
            if err.description.to_ascii_lowercase().contains("permission") {
                CaptureError::PermissionDenied(err.description)
            } else {
                CaptureError::StreamBuild(err.description)
            }
        }
        other => CaptureError::StreamBuild(other.to_string()),
    }
}
