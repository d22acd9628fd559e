//! All-pole frequency response evaluated on a fixed bin grid

use num_complex::Complex64;
use std::f64::consts::PI;

/// Constant phase term added to every evaluated angle.
///
/// It factors out of the sum as the unit phasor `e^{j}`, so magnitudes are
/// unchanged; kept for parity with the reference evaluation.
pub const PHASE_OFFSET: f64 = 1.0;

/// Per-bin angular increments, fixed once sample rate and resolution are known
#[derive(Debug, Clone, PartialEq)]
pub struct AngleTable {
    theta: Vec<f64>,
}

impl AngleTable {
    /// `θ[z] = z · (max_freq / resolution) · π / (sample_rate / 2)` for `z in 0..=resolution`
    pub fn new(sample_rate: u32, max_freq: f64, resolution: usize) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let inc = (max_freq / resolution as f64) * PI / nyquist;
        let theta = (0..=resolution).map(|z| z as f64 * inc).collect();
        Self { theta }
    }

    /// Number of evaluated bins (one less than the table length)
    pub fn resolution(&self) -> usize {
        self.theta.len().saturating_sub(1)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.theta
    }
}

/// Log-magnitude of `1 / A(e^{jθ})` for every bin of `table`.
///
/// Bins whose denominator is not positive, or whose value is not finite, are 0.
pub fn frequency_response(coeffs: &[f64], table: &AngleTable) -> Vec<f64> {
    let resolution = table.resolution();
    let theta = table.as_slice();

    (0..resolution)
        .map(|z| {
            let a: Complex64 = coeffs
                .iter()
                .enumerate()
                .map(|(j, &c)| c * Complex64::from_polar(1.0, theta[z] * j as f64 + PHASE_OFFSET))
                .sum();

            let denominator = a.norm_sqr();
            if denominator > 0.0 {
                let magnitude = (1.0 / denominator.sqrt()).log10();
                if magnitude.is_finite() {
                    return magnitude;
                }
            }
            0.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_table() {
        let table = AngleTable::new(44100, 4096.0, 64);
        assert_eq!(table.resolution(), 64);
        assert_eq!(table.as_slice().len(), 65);
        assert_eq!(table.as_slice()[0], 0.0);

        let last = table.as_slice()[64];
        let expected = 4096.0 * PI / 22050.0;
        assert!((last - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unit_polynomial_is_flat_zero() {
        // |1 · e^{j}| = 1, log10(1) = 0 everywhere
        let table = AngleTable::new(44100, 4096.0, 64);
        let mut coeffs = vec![0.0; 65];
        coeffs[0] = 1.0;

        let h = frequency_response(&coeffs, &table);
        assert_eq!(h.len(), 64);
        assert!(h.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn test_phase_offset_applies_to_constant_term() {
        // A(θ) = 1 + 0.5·e^{j(θ+1)} with the offset also on j = 0
        let table = AngleTable::new(8000, 4000.0, 4);
        let coeffs = [1.0, 0.5];
        let h = frequency_response(&coeffs, &table);

        let theta = table.as_slice()[1];
        let re = (1.0f64).cos() + 0.5 * (theta + 1.0).cos();
        let im = (1.0f64).sin() + 0.5 * (theta + 1.0).sin();
        let expected = (1.0 / (re * re + im * im).sqrt()).log10();
        assert!((h[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_phase_offset_leaves_magnitude_unchanged() {
        let table = AngleTable::new(44100, 4096.0, 64);
        let coeffs = [1.0, -0.9, 0.4, -0.1];
        let h = frequency_response(&coeffs, &table);

        for (z, &theta) in table.as_slice()[..64].iter().enumerate() {
            let plain: Complex64 = coeffs
                .iter()
                .enumerate()
                .map(|(j, &c)| c * Complex64::from_polar(1.0, theta * j as f64))
                .sum();
            let expected = (1.0 / plain.norm()).log10();
            assert!((h[z] - expected).abs() < 1e-12, "bin {}", z);
        }
    }

    #[test]
    fn test_zero_polynomial_gives_zero() {
        let table = AngleTable::new(16000, 4000.0, 8);
        let h = frequency_response(&[0.0, 0.0], &table);
        assert_eq!(h, vec![0.0; 8]);
    }
}
