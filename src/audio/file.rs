//! In-memory and WAV-file frame sources

use crossbeam_channel::{bounded, unbounded, Receiver};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use super::capture::FrameSource;
use super::frame::{AudioSample, Frame, FrameAssembler};
use crate::error::{CaptureError, Result};

/// Read a WAV file and mix it down to mono `f32` samples
pub fn read_wav_mono(path: &Path) -> Result<(Vec<AudioSample>, u32)> {
    let mut reader = hound::WavReader::open(path)?;

    let spec = reader.spec();
    info!(
        "WAV format: {} channels, {} Hz, {} bits",
        spec.channels, spec.sample_rate, spec.bits_per_sample
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let mono = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

/// Replays a fixed list of frames, either as fast as possible or paced at
/// the frame rate to imitate a live device.
pub struct MemorySource {
    frames: Vec<Frame>,
    sample_rate: u32,
    frame_size: usize,
    pacing: Option<Duration>,
    is_running: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            frames,
            sample_rate,
            frame_size,
            pacing: None,
            is_running: Arc::new(AtomicBool::new(false)),
            feeder: None,
        }
    }

    /// Cut a continuous signal into frames; the trailing partial frame is zero-padded
    pub fn from_samples(samples: &[AudioSample], sample_rate: u32, frame_size: usize) -> Self {
        let mut assembler = FrameAssembler::new(frame_size, sample_rate);
        let mut frames = assembler.push(samples);
        frames.extend(assembler.flush());
        Self::new(frames, sample_rate, frame_size)
    }

    /// Load a WAV file as a frame source
    pub fn from_wav(path: &Path, frame_size: usize) -> Result<Self> {
        let (samples, sample_rate) = read_wav_mono(path)?;
        debug!(
            "Loaded {} samples ({:.2}s) from {}",
            samples.len(),
            samples.len() as f32 / sample_rate.max(1) as f32,
            path.display()
        );
        Ok(Self::from_samples(&samples, sample_rate, frame_size))
    }

    /// Deliver one frame per `interval` instead of all at once
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = Some(interval);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        let mut this = self;
        std::mem::take(&mut this.frames)
    }
}

impl FrameSource for MemorySource {
    fn start(&mut self) -> std::result::Result<Receiver<Frame>, CaptureError> {
        self.stop();
        self.is_running.store(true, Ordering::Relaxed);
        let frames = self.frames.clone();

        match self.pacing {
            None => {
                let (sender, receiver) = unbounded();
                for frame in frames {
                    // Receiver is alive, cannot fail
                    let _ = sender.send(frame);
                }
                Ok(receiver)
            }
            Some(interval) => {
                let (sender, receiver) = bounded(frames.len().max(1));
                let is_running = self.is_running.clone();
                self.feeder = Some(thread::spawn(move || {
                    for frame in frames {
                        if !is_running.load(Ordering::Relaxed) || sender.send(frame).is_err() {
                            break;
                        }
                        thread::sleep(interval);
                    }
                }));
                Ok(receiver)
            }
        }
    }

    fn stop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.feeder.take() {
            let _ = handle.join();
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.stop();
    }
}
