//! Fixed-length analysis frames and the assembler that cuts them from a stream

/// Audio sample type alias
pub type AudioSample = f32;

/// An immutable, fixed-length block of mono samples
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    samples: Vec<AudioSample>,
    sample_rate: u32,
}

impl Frame {
    pub fn new(samples: Vec<AudioSample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A frame of `len` zero samples
    pub fn silent(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[AudioSample] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Collects arbitrarily sized chunks into consecutive fixed-length frames.
///
/// Device callbacks deliver whatever block size the driver picked; the
/// analysis needs exactly `frame_size` samples per invocation.
pub struct FrameAssembler {
    pending: Vec<AudioSample>,
    frame_size: usize,
    sample_rate: u32,
}

impl FrameAssembler {
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        Self {
            pending: Vec::with_capacity(frame_size * 2),
            frame_size,
            sample_rate,
        }
    }

    /// Append samples and return every frame that became complete
    pub fn push(&mut self, samples: &[AudioSample]) -> Vec<Frame> {
        self.pending.extend_from_slice(samples);

        if self.frame_size == 0 {
            return Vec::new();
        }

        let mut frames = Vec::with_capacity(self.pending.len() / self.frame_size);
        while self.pending.len() >= self.frame_size {
            let chunk: Vec<AudioSample> = self.pending.drain(..self.frame_size).collect();
            frames.push(Frame::new(chunk, self.sample_rate));
        }
        frames
    }

    /// Number of samples waiting for the next frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Zero-pad and emit the partial frame, if any
    pub fn flush(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.resize(self.frame_size, 0.0);
        Some(Frame::new(chunk, self.sample_rate))
    }
}
