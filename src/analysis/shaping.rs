//! Display shaping of the raw envelope: expansion, scaling, smoothing, normalization

/// Linearly expand `source` towards `target_len` points.
///
/// Each source point emits `floor(target_len / source.len())` values; the
/// last point repeats flat. The result can be shorter than `target_len`.
pub fn expand(source: &[f64], target_len: usize) -> Vec<f64> {
    if source.is_empty() {
        return Vec::new();
    }

    let steps = target_len as f64 / source.len() as f64;
    let per_point = steps.floor() as usize;
    let mut result = Vec::with_capacity(per_point * source.len());

    for (i, &current) in source.iter().enumerate() {
        let slope = match source.get(i + 1) {
            Some(&next) => (next - current) / steps,
            None => 0.0,
        };
        result.extend((0..per_point).map(|j| current + slope * j as f64));
    }

    result
}

/// Multiply every value by `sensitivity / 100`
pub fn scale(values: &mut [f64], sensitivity: f64) {
    let factor = sensitivity / 100.0;
    for v in values.iter_mut() {
        *v *= factor;
    }
}

/// Asymmetric attack/decay smoothing with a hold band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    pub attack_rate: f64,
    pub decay_rate: f64,
    pub dead_zone: f64,
}

impl Smoother {
    pub fn new(attack_rate: f64, decay_rate: f64, dead_zone: f64) -> Self {
        Self {
            attack_rate,
            decay_rate,
            dead_zone,
        }
    }

    /// Move `previous` towards `target`, bin by bin.
    ///
    /// Returns `target` unchanged when the lengths differ.
    pub fn apply(&self, previous: &[f64], target: &[f64]) -> Vec<f64> {
        if previous.len() != target.len() {
            return target.to_vec();
        }

        let half_band = self.dead_zone / 2.0;
        previous
            .iter()
            .zip(target)
            .map(|(&current, &target)| {
                if current > target - half_band && current < target + half_band {
                    current
                } else if current < target {
                    current + (target - current) * self.attack_rate
                } else {
                    (current - self.decay_rate * (current - target)).max(0.0)
                }
            })
            .collect()
    }
}

/// Divide by the maximum when it exceeds 1.0
pub fn normalize(values: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 1.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}
