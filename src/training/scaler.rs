//! Z-score feature standardization

use serde::{Deserialize, Serialize};

/// Per-column mean and standard deviation fitted on a feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows of equal width; constant columns get a unit scale
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut sum = vec![0.0f64; dim];
        let mut sum_sq = vec![0.0f64; dim];
        for row in rows {
            for j in 0..dim {
                sum[j] += row[j];
                sum_sq[j] += row[j] * row[j];
            }
        }

        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let std: Vec<f64> = sum_sq
            .iter()
            .zip(mean.iter())
            .map(|(sq, m)| {
                let var = (sq / n - m * m).max(0.0);
                if var.sqrt() < 1e-12 {
                    1.0
                } else {
                    var.sqrt()
                }
            })
            .collect();

        StandardScaler { mean, std }
    }

    /// Standardize one row: (x - mean) / std
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}
