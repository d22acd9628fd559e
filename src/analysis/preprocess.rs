//! Frame conditioning ahead of LPC analysis: mean removal, windowing, DC blocking

use std::f64::consts::PI;

/// Peak gain of the raised-cosine window. Not the unit-gain Hann form.
pub const WINDOW_GAIN: f64 = 0.8165;

/// Pole of the first-order DC blocker
pub const DC_BLOCK_COEFF: f64 = 0.95;

/// `WINDOW_GAIN * (1 - cos(2πi/N))` for `i in 0..N`
pub fn raised_cosine_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| WINDOW_GAIN * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Arithmetic mean, zero for an empty slice
pub fn mean(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64
}

/// First-order DC blocker whose memory carries over between frames
#[derive(Debug, Clone, Default)]
pub struct DcBlocker {
    last_input: f64,
}

impl DcBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `y[i] = x[i] - k·s`, then `s = x[i]`
    pub fn process(&mut self, samples: &mut [f64]) {
        for sample in samples.iter_mut() {
            let input = *sample;
            *sample = input - DC_BLOCK_COEFF * self.last_input;
            self.last_input = input;
        }
    }

}

/// Remove the mean, apply `window` and run the DC blocker.
///
/// `window` must have the same length as `samples`.
pub fn preprocess(samples: &[f32], window: &[f64], blocker: &mut DcBlocker) -> Vec<f64> {
    debug_assert_eq!(samples.len(), window.len());

    let mean = mean(samples);
    let mut output: Vec<f64> = samples
        .iter()
        .zip(window)
        .map(|(&s, &w)| (s as f64 - mean) * w)
        .collect();

    blocker.process(&mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_shape() {
        let w = raised_cosine_window(8);
        assert_eq!(w.len(), 8);
        assert_eq!(w[0], 0.0);
        // Peak at N/2 is 2W
        assert!((w[4] - 2.0 * WINDOW_GAIN).abs() < 1e-12);
        assert!((w[2] - w[6]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_frame_becomes_zero() {
        let samples = vec![0.7f32; 64];
        let window = raised_cosine_window(64);
        let mut blocker = DcBlocker::new();

        let out = preprocess(&samples, &window, &mut blocker);
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn test_zero_frame_stays_zero() {
        let samples = vec![0.0f32; 32];
        let window = raised_cosine_window(32);
        let mut blocker = DcBlocker::new();
        let out = preprocess(&samples, &window, &mut blocker);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dc_blocker_carries_memory() {
        let mut blocker = DcBlocker::new();
        let mut first = vec![1.0, 2.0];
        blocker.process(&mut first);
        assert_eq!(first, vec![1.0, 2.0 - 0.95]);

        // Next frame starts from the previous frame's last input
        let mut second = vec![0.0];
        blocker.process(&mut second);
        assert!((second[0] + 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
    }
}
