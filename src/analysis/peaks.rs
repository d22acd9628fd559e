//! Resonance peak picking on the smoothed, normalized spectrum

/// Peaks at or below this level are ignored
pub const MIN_PEAK_ENERGY: f64 = 0.1;

/// Fixed left reach of the neighbourhood check
pub const LEFT_NEIGHBOURS: usize = 5;

/// Right reach of the neighbourhood check and the edge margin: `max(1, len / 25)`
pub fn locality(len: usize) -> usize {
    (len / 25).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slope {
    Flat,
    Rising,
    Falling,
}

/// Ascending indices of accepted local maxima.
///
/// A rising-to-falling turn at `i` is accepted when its value exceeds
/// [`MIN_PEAK_ENERGY`], `locality < i < len - locality`, and it is strictly
/// greater than every other sample in `[i - 5, i + locality)`.
pub fn find_peaks(mags: &[f64]) -> Vec<usize> {
    let len = mags.len();
    let how_local = locality(len);
    let mut peaks = Vec::new();
    if len < 2 {
        return peaks;
    }

    let mut slope = Slope::Flat;
    let mut i = 0;

    // A rising start is handled by the main scan at the same index
    while slope == Slope::Flat && i < len - 1 {
        if mags[i] < mags[i + 1] {
            slope = Slope::Rising;
            break;
        } else if mags[i] > mags[i + 1] {
            slope = Slope::Falling;
        }
        i += 1;
    }

    while i < len - 1 {
        match slope {
            Slope::Rising => {
                if mags[i] > mags[i + 1] {
                    if mags[i] > MIN_PEAK_ENERGY
                        && i > how_local
                        && i < len - how_local
                        && dominates_neighbours(mags, i, how_local)
                    {
                        peaks.push(i);
                    }
                    slope = Slope::Falling;
                }
            }
            Slope::Falling | Slope::Flat => {
                if mags[i] < mags[i + 1] {
                    slope = Slope::Rising;
                }
            }
        }
        i += 1;
    }

    peaks
}

/// True when `mags[index]` beats every in-range sample of `[index - 5, index + right)`
fn dominates_neighbours(mags: &[f64], index: usize, right: usize) -> bool {
    let start = index.saturating_sub(LEFT_NEIGHBOURS);
    let end = (index + right).min(mags.len());
    (start..end)
        .filter(|&j| j != index)
        .all(|j| mags[index] > mags[j])
}
