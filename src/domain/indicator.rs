//! Rolling indicator calculations over daily closes and volumes.
//!
//! Every function returns one value per input row. `None` marks a row whose
//! trailing window is not yet fully populated (or whose inputs are missing).

/// Percentage change over `period` rows: `v[i] / v[i - period] - 1`.
///
/// A zero base yields `None` rather than an infinite return.
pub fn pct_change(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            let base = values[i - period];
            if base == 0.0 {
                None
            } else {
                Some(values[i] / base - 1.0)
            }
        })
        .collect()
}

/// Absolute change from the previous row: `|v[i] - v[i - 1]|`.
pub fn abs_change(values: &[f64]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| (i > 0).then(|| (values[i] - values[i - 1]).abs()))
        .collect()
}

/// Simple moving average over a trailing window that includes the current row.
///
/// Produces `None` until `window` consecutive defined values are available.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mut sum = 0.0;
            for v in slice {
                sum += (*v)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}
