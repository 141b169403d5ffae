//! Evaluation metrics for regression and threshold classification

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::numeric::mean;

/// Error metrics for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    /// Undefined when the actual values have zero variance
    pub r2: Option<f64>,
}

impl RegressionMetrics {
    /// Compare predictions with actual values; `None` if empty or mismatched
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return None;
        }
        let n = actual.len() as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            abs_sum += (a - p).abs();
            sq_sum += (a - p).powi(2);
        }

        Some(RegressionMetrics {
            mae: abs_sum / n,
            mse: sq_sum / n,
            r2: r2_score(actual, predicted),
        })
    }

    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAE: {:.4} | MSE: {:.4}", self.mae, self.mse)?;
        match self.r2 {
            Some(r2) => write!(f, " | R²: {:.4}", r2),
            None => write!(f, " | R²: n/a"),
        }
    }
}

/// Coefficient of determination
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let mu = mean(actual)?;
    let ss_tot: f64 = actual.iter().map(|a| (a - mu).powi(2)).sum();
    if ss_tot < 1e-12 {
        return None;
    }
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Fold-by-fold accumulator for cross-validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationMetrics {
    pub folds: usize,
    mae_sum: f64,
    mse_sum: f64,
    r2_sum: f64,
    r2_folds: usize,
}

impl CrossValidationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fold
    pub fn update(&mut self, fold: &RegressionMetrics) {
        self.folds += 1;
        self.mae_sum += fold.mae;
        self.mse_sum += fold.mse;
        if let Some(r2) = fold.r2 {
            self.r2_sum += r2;
            self.r2_folds += 1;
        }
    }

    pub fn merge(&mut self, other: &CrossValidationMetrics) {
        self.folds += other.folds;
        self.mae_sum += other.mae_sum;
        self.mse_sum += other.mse_sum;
        self.r2_sum += other.r2_sum;
        self.r2_folds += other.r2_folds;
    }

    pub fn mean_mae(&self) -> Option<f64> {
        (self.folds > 0).then(|| self.mae_sum / self.folds as f64)
    }

    pub fn mean_mse(&self) -> Option<f64> {
        (self.folds > 0).then(|| self.mse_sum / self.folds as f64)
    }

    /// Mean over folds where R² was defined
    pub fn mean_r2(&self) -> Option<f64> {
        (self.r2_folds > 0).then(|| self.r2_sum / self.r2_folds as f64)
    }

    /// Collapse into averaged metrics
    pub fn summary(&self) -> Option<RegressionMetrics> {
        Some(RegressionMetrics {
            mae: self.mean_mae()?,
            mse: self.mean_mse()?,
            r2: self.mean_r2(),
        })
    }
}

impl fmt::Display for CrossValidationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Some(m) => write!(f, "{} folds | {}", self.folds, m),
            None => write!(f, "no folds"),
        }
    }
}

/// Binary outcome counts after thresholding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    /// Classify both actual and predicted values as `value > threshold`
    pub fn from_threshold(actual: &[f64], predicted: &[f64], threshold: f64) -> Self {
        let mut m = ConfusionMatrix::default();
        for (a, p) in actual.iter().zip(predicted) {
            m.update(*a > threshold, *p > threshold);
        }
        m
    }

    pub fn update(&mut self, actual: bool, predicted: bool) {
        match (actual, predicted) {
            (true, true) => self.true_positive += 1,
            (false, true) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (true, false) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| (self.true_positive + self.true_negative) as f64 / total as f64)
    }

    /// As a 2x2 grid: rows are actual (negative, positive), columns predicted
    pub fn as_grid(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

/// One point on a ROC curve; the origin has no threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub threshold: Option<f64>,
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
}

/// ROC curve over every distinct score, highest threshold first
///
/// Returns `None` unless both classes are present.
pub fn roc_curve(labels: &[bool], scores: &[f64]) -> Option<Vec<RocPoint>> {
    if labels.len() != scores.len() {
        return None;
    }
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = vec![RocPoint {
        threshold: None,
        false_positive_rate: 0.0,
        true_positive_rate: 0.0,
    }];

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        // Consume every sample tied at this score
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold: Some(threshold),
            false_positive_rate: fp as f64 / negatives as f64,
            true_positive_rate: tp as f64 / positives as f64,
        });
    }

    Some(points)
}

/// Area under a curve by the trapezoid rule
pub fn auc(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| {
            let dx = w[1].false_positive_rate - w[0].false_positive_rate;
            dx * (w[0].true_positive_rate + w[1].true_positive_rate) / 2.0
        })
        .sum()
}
