//! Descriptive statistics for one numeric attribute

use serde::{Deserialize, Serialize};

use super::numeric::{distinct_count, mean, median, ratio, round_to, sample_std};

/// Mean/median/mode/spread bundle for one attribute over a set of records
///
/// Every statistic is `None` when the sample set is empty; the standard
/// deviation is also `None` below two samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatisticBundle {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Most frequent value, smallest value on ties
    pub mode: Option<f64>,
    pub mode_count: usize,
    pub standard_deviation: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub percentage_below_mean: Option<f64>,
    pub percentage_below_median: Option<f64>,
    pub percentage_below_mode: Option<f64>,
}

/// Describe a sequence of samples
pub fn describe(samples: &[f64]) -> StatisticBundle {
    let mean = mean(samples);
    let median = median(samples);
    let mode = mode(samples);

    let below = |threshold: Option<f64>| threshold.and_then(|t| percentage_below(samples, t));

    StatisticBundle {
        count: samples.len(),
        mean,
        median,
        mode: mode.map(|(value, _)| value),
        mode_count: mode.map(|(_, count)| count).unwrap_or(0),
        standard_deviation: sample_std(samples),
        min: samples.iter().copied().reduce(f64::min),
        max: samples.iter().copied().reduce(f64::max),
        percentage_below_mean: below(mean),
        percentage_below_median: below(median),
        percentage_below_mode: below(mode.map(|(value, _)| value)),
    }
}

/// Most frequent value and its count; ties resolve to the smallest value
pub fn mode(samples: &[f64]) -> Option<(f64, usize)> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let value = sorted[i];
        let run = sorted[i..].iter().take_while(|v| **v == value).count();
        // Strictly greater keeps the earliest (smallest) value on ties
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((value, run));
        }
        i += run.max(1);
    }
    best
}

/// Share of samples strictly below the threshold, as a percentage with two decimals
pub fn percentage_below(samples: &[f64], threshold: f64) -> Option<f64> {
    let below = samples.iter().filter(|v| **v < threshold).count();
    ratio(below as f64 * 100.0, samples.len() as f64).map(|p| round_to(p, 2))
}

/// Pearson correlation, `None` when either side is constant or lengths differ
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || distinct_count(a) <= 1 || distinct_count(b) <= 1 {
        return None;
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    ratio(cov, (var_a * var_b).sqrt())
}
