//! Linear prediction: tapered autocorrelation and Levinson-Durbin recursion

/// Autocorrelation for lags `0..N/2`, each lag scaled by `(N/2 - lag) / N`.
///
/// The taper is triangular, so the result is not energy normalized.
pub fn autocorrelation(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let half = n / 2;
    if n == 0 {
        return Vec::new();
    }

    let norm = 1.0 / n as f64;
    (0..half)
        .map(|lag| {
            let sum: f64 = x[lag..].iter().zip(x).map(|(a, b)| a * b).sum();
            sum * (half - lag) as f64 * norm
        })
        .collect()
}

/// Levinson-Durbin recursion returning the `order` predictor weights `a[1..=order]`.
///
/// Runs up to `min(order, r.len() - 1)`. Anything the recursion does not
/// reach stays zero, and a zero-energy or too-short input yields all zeros.
pub fn levinson_durbin(r: &[f64], order: usize) -> Vec<f64> {
    let mut a = vec![0.0f64; order + 1];
    if r.len() <= 1 || r[0] == 0.0 {
        return a.split_off(1);
    }

    let mut e = r[0];
    let max_order = order.min(r.len() - 1);
    let mut prev = a.clone();

    for i in 1..=max_order {
        if e == 0.0 {
            break;
        }

        let mut lambda = r[i];
        for j in 1..i {
            lambda -= a[j] * r[i - j];
        }
        lambda /= e;

        prev.copy_from_slice(&a);
        for j in 1..i {
            a[j] = prev[j] - lambda * prev[i - j];
        }
        a[i] = lambda;

        e *= 1.0 - lambda * lambda;
    }

    a.split_off(1)
}

/// Predictor polynomial `[1, -a1, ..., -ap]` for a preprocessed frame.
///
/// Always `order + 1` long; silent or degenerate frames give `[1, 0, ..., 0]`.
pub fn predictor_coefficients(processed: &[f64], order: usize) -> Vec<f64> {
    let r = autocorrelation(processed);
    let weights = levinson_durbin(&r, order);

    let mut coeffs = Vec::with_capacity(order + 1);
    coeffs.push(1.0);
    coeffs.extend(weights.iter().map(|w| -w));
    coeffs
}
