//! Third-resonance alignment against the target band, with debounce

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::config::FeedbackConfig;

/// Index of the clinically relevant peak (the third resonance)
pub const TARGET_PEAK: usize = 2;

/// Target frequency plus the frequency range it is placed in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBand {
    pub target_frequency: f64,
    pub max_frequency: f64,
    pub tolerance: f64,
}

impl TargetBand {
    pub fn new(target_frequency: f64, max_frequency: f64, tolerance: f64) -> Self {
        Self {
            target_frequency,
            max_frequency,
            tolerance,
        }
    }

    /// Fractional position of the target within `0..max_frequency`
    pub fn position(&self) -> f64 {
        self.target_frequency / self.max_frequency
    }

    pub fn contains(&self, position: f64) -> bool {
        (position - self.position()).abs() < self.tolerance
    }
}

impl From<&FeedbackConfig> for TargetBand {
    fn from(config: &FeedbackConfig) -> Self {
        Self::new(config.target_frequency, config.max_frequency, config.tolerance)
    }
}

/// Rate limiter for haptic cues; the stored instant never moves backwards
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Record a trigger at `now` if at least `interval` has passed since the last one
    pub fn try_fire(&mut self, now: Instant) -> bool {
        let ready = match self.last {
            None => true,
            Some(last) => now > last && now.duration_since(last) >= self.interval,
        };
        if ready {
            self.last = Some(now);
        }
        ready
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Outcome of one alignment check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alignment {
    /// Fewer than three peaks, or an empty spectrum
    NoTargetPeak,
    /// The third peak sits outside the band
    OffTarget { position: f64 },
    /// The third peak sits inside the band; `fired` tells whether a cue went out
    OnTarget { position: f64, fired: bool },
}

impl Alignment {
    pub fn fired(&self) -> bool {
        matches!(self, Alignment::OnTarget { fired: true, .. })
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Alignment::OnTarget { .. })
    }
}

/// Checks the third peak of each frame against a [`TargetBand`]
#[derive(Debug, Clone)]
pub struct AlignmentDetector {
    band: TargetBand,
}

impl AlignmentDetector {
    pub fn new(band: TargetBand) -> Self {
        Self { band }
    }

    pub fn band(&self) -> &TargetBand {
        &self.band
    }

    pub fn set_target_frequency(&mut self, frequency: f64) {
        self.band.target_frequency = frequency;
    }

    pub fn check(
        &self,
        peaks: &[usize],
        total_bins: usize,
        debouncer: &mut Debouncer,
        now: Instant,
    ) -> Alignment {
        if peaks.len() <= TARGET_PEAK || total_bins == 0 {
            return Alignment::NoTargetPeak;
        }

        let position = peaks[TARGET_PEAK] as f64 / total_bins.max(1) as f64;
        if !self.band.contains(position) {
            return Alignment::OffTarget { position };
        }

        let fired = debouncer.try_fire(now);
        trace!(
            "Third peak at {:.3} (target {:.3}), fired={}",
            position,
            self.band.position(),
            fired
        );
        Alignment::OnTarget { position, fired }
    }
}

/// Target frequency shared between a controlling thread and the analysis worker
#[derive(Debug)]
pub struct SharedTarget {
    bits: AtomicU64,
}

impl SharedTarget {
    pub fn new(frequency: f64) -> Self {
        Self {
            bits: AtomicU64::new(frequency.to_bits()),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, frequency: f64) {
        self.bits.store(frequency.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> AlignmentDetector {
        AlignmentDetector::new(TargetBand::new(1700.0, 4600.0, 0.08))
    }

    /// Peak list whose third entry lands on the 1700 Hz target in 512 bins
    fn aligned_peaks() -> Vec<usize> {
        let idx = (1700.0 / 4600.0 * 512.0) as usize;
        vec![40, 100, idx]
    }

    #[test]
    fn test_band_position() {
        let band = TargetBand::new(2300.0, 4600.0, 0.08);
        assert_eq!(band.position(), 0.5);
        assert!(band.contains(0.45));
        assert!(!band.contains(0.6));
    }

    #[test]
    fn test_requires_three_peaks() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let now = Instant::now();
        assert_eq!(
            detector().check(&[10, 20], 512, &mut debouncer, now),
            Alignment::NoTargetPeak
        );
        assert_eq!(
            detector().check(&aligned_peaks(), 0, &mut debouncer, now),
            Alignment::NoTargetPeak
        );
        assert!(debouncer.last_trigger().is_none());
    }

    #[test]
    fn test_off_target() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let result = detector().check(&[10, 20, 400], 512, &mut debouncer, Instant::now());
        assert!(matches!(result, Alignment::OffTarget { .. }));
        assert!(!result.fired());
    }

    #[test]
    fn test_debounce_100ms_fires_once() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        let peaks = aligned_peaks();

        let first = detector().check(&peaks, 512, &mut debouncer, t0);
        let second =
            detector().check(&peaks, 512, &mut debouncer, t0 + Duration::from_millis(100));

        assert!(first.fired());
        assert!(second.is_hit());
        assert!(!second.fired());
        assert_eq!(debouncer.last_trigger(), Some(t0));
    }

    #[test]
    fn test_debounce_600ms_fires_twice() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        let peaks = aligned_peaks();

        let first = detector().check(&peaks, 512, &mut debouncer, t0);
        let t1 = t0 + Duration::from_millis(600);
        let second = detector().check(&peaks, 512, &mut debouncer, t1);

        assert!(first.fired());
        assert!(second.fired());
        assert_eq!(debouncer.last_trigger(), Some(t1));
    }

    #[test]
    fn test_debouncer_never_moves_backwards() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now() + Duration::from_secs(10);
        assert!(debouncer.try_fire(t0));
        assert!(!debouncer.try_fire(t0 - Duration::from_secs(5)));
        assert_eq!(debouncer.last_trigger(), Some(t0));
    }

    #[test]
    fn test_retarget() {
        let mut detector = detector();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        // Third peak at 2300 Hz: 0.13 away from 1700 Hz, 0.065 from 2000 Hz
        let peaks = vec![40, 100, 256];
        assert!(!detector.check(&peaks, 512, &mut debouncer, Instant::now()).is_hit());

        detector.set_target_frequency(2000.0);
        assert!(detector.check(&peaks, 512, &mut debouncer, Instant::now()).fired());
    }

    #[test]
    fn test_shared_target() {
        let shared = SharedTarget::new(1700.0);
        assert_eq!(shared.get(), 1700.0);
        shared.set(2000.0);
        assert_eq!(shared.get(), 2000.0);
    }
}
