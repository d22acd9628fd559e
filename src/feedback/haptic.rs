//! Haptic cue delivery

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::time::{Duration, Instant};
use tracing::warn;

/// One fire-and-forget vibration request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticCue {
    /// When the alignment that caused the cue was detected
    pub at: Instant,
    /// Requested pulse length
    pub pulse: Duration,
}

/// Receives haptic cues. Implementations must not block the analysis thread.
pub trait HapticSink: Send + Sync {
    fn trigger(&self, cue: HapticCue);
}

impl<F> HapticSink for F
where
    F: Fn(HapticCue) + Send + Sync,
{
    fn trigger(&self, cue: HapticCue) {
        self(cue)
    }
}

/// Discards every cue
pub struct NullHapticSink;

impl HapticSink for NullHapticSink {
    fn trigger(&self, _cue: HapticCue) {}
}

/// Forwards cues over a bounded channel; drops them when the consumer lags
pub struct ChannelHapticSink {
    sender: Sender<HapticCue>,
}

impl ChannelHapticSink {
    pub fn new(capacity: usize) -> (Self, Receiver<HapticCue>) {
        let (sender, receiver) = bounded(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl HapticSink for ChannelHapticSink {
    fn trigger(&self, cue: HapticCue) {
        match self.sender.try_send(cue) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Haptic queue full - dropping cue"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cue() -> HapticCue {
        HapticCue {
            at: Instant::now(),
            pulse: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, receiver) = ChannelHapticSink::new(4);
        sink.trigger(cue());
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, receiver) = ChannelHapticSink::new(1);
        sink.trigger(cue());
        sink.trigger(cue());
        assert_eq!(receiver.try_iter().count(), 1);

        drop(receiver);
        // Disconnected consumer is not an error
        sink.trigger(cue());
    }

    #[test]
    fn test_closure_sink() {
        let count = AtomicUsize::new(0);
        let sink = |_cue: HapticCue| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        sink.trigger(cue());
        sink.trigger(cue());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
