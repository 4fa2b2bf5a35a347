//! Small numeric helpers shared by the detectors.

/// Least-squares line through `(xs[i], ys[i])`, returned as `(slope, intercept)`.
///
/// `None` when fewer than two points are given or all `xs` coincide.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let count = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / count;
    let mean_y = ys[..n].iter().sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        covariance += (x - mean_x) * (y - mean_y);
        variance += (x - mean_x) * (x - mean_x);
    }
    if variance <= f64::EPSILON {
        return None;
    }
    let slope = covariance / variance;
    Some((slope, mean_y - slope * mean_x))
}

/// Slope of `values` against their position `0, 1, 2, ...`.
pub fn index_slope(values: &[f64]) -> Option<f64> {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    linear_fit(&xs, values).map(|(slope, _)| slope)
}

/// Clamps into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else if value == f64::INFINITY {
        1.0
    } else {
        0.0
    }
}

/// `1` when the middle point sits exactly halfway in time between the outer two.
pub fn time_symmetry(first: usize, middle: usize, last: usize) -> f64 {
    if last <= first || middle < first || middle > last {
        return 0.0;
    }
    let left = (middle - first) as f64;
    let right = (last - middle) as f64;
    clamp_unit(1.0 - (left - right).abs() / (last - first) as f64)
}

/// Mean of `values`, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Trailing rolling mean; the first `period - 1` entries average what is available.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }
        out.push(sum / (i + 1).min(period) as f64);
    }
    out
}
