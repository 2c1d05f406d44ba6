//! Smoothing and differentiation of sampled series.

use super::EstimatorParams;

/// Moving-average window for `n` samples under the default parameters.
pub fn moving_average_window(n: usize) -> usize {
    EstimatorParams::default().window_for(n)
}

/// Number of leading (acceleration-phase) samples discarded for `n` samples
/// under the default parameters.
pub fn acceleration_skip(n: usize) -> usize {
    EstimatorParams::default().skip_for(n)
}

/// Trailing moving average of width `window`.
///
/// The first `window - 1` outputs average over the samples available so
/// far, so the output has the same length as the input and no padding is
/// invented.
pub fn trailing_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for (i, &v) in values.iter().enumerate() {
        acc += v;
        if i >= window {
            acc -= values[i - window];
        }
        out.push(acc / (i + 1).min(window) as f64);
    }
    out
}

/// Numerical derivative `dy/dt`.
///
/// Interior points use the central difference over their two neighbours;
/// the end points use one-sided differences. Fewer than two points yield an
/// empty series. Times must be strictly increasing.
pub fn central_gradient(t: &[f64], y: &[f64]) -> Vec<f64> {
    let n = t.len().min(y.len());
    if n < 2 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(n - 1);
            (y[hi] - y[lo]) / (t[hi] - t[lo])
        })
        .collect()
}
