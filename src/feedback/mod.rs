//! Target alignment and haptic feedback

pub mod alignment;
pub mod clock;
pub mod haptic;

pub use alignment::{Alignment, AlignmentDetector, Debouncer, SharedTarget, TargetBand};
pub use clock::{Clock, ManualClock, SystemClock};
pub use haptic::{ChannelHapticSink, HapticCue, HapticSink, NullHapticSink};
