//! Shared numeric helpers
//!
//! Every division in the crate goes through [`ratio`] so that a zero
//! denominator yields `None` instead of NaN or infinity.

/// Safe division: `None` when the denominator is zero or the result is not finite
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// Round half away from zero to the given number of decimals
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    ratio(values.iter().sum::<f64>(), values.len() as f64)
}

/// Bessel-corrected sample standard deviation, `None` for fewer than two samples
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    ratio(sum_sq, (values.len() - 1) as f64).map(f64::sqrt)
}

/// Population standard deviation (divisor n), `None` for an empty slice
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    ratio(sum_sq, values.len() as f64).map(f64::sqrt)
}

/// Median of the samples, `None` for an empty slice
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Number of distinct values
pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}
