//! Audio input: fixed-size frames and the sources that produce them

pub mod capture;
pub mod file;
pub mod frame;

pub use capture::{FrameSource, MicrophoneSource};
pub use file::{read_wav_mono, MemorySource};
pub use frame::{AudioSample, Frame, FrameAssembler};
