//! Ordinary least squares regression

use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::{NbaError, Result};

/// Tiny ridge term keeping the normal equations solvable for collinear features
const RIDGE: f64 = 1e-8;

/// Linear model `y = w·x + b` fitted by least squares
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_shapes(x, y)?;
        let n = x.len() as f64;
        let dim = x[0].len();

        // Center so the intercept falls out of the solve
        let x_mean: Vec<f64> = (0..dim)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;

        let mut gram = vec![vec![0.0f64; dim]; dim];
        let mut rhs = vec![0.0f64; dim];
        for (row, target) in x.iter().zip(y) {
            let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            let t = target - y_mean;
            for a in 0..dim {
                rhs[a] += centered[a] * t;
                for b in 0..dim {
                    gram[a][b] += centered[a] * centered[b];
                }
            }
        }
        for (a, row) in gram.iter_mut().enumerate() {
            row[a] += RIDGE * n;
        }

        let coefficients = solve(gram, rhs).ok_or_else(|| {
            NbaError::InvalidArgument("Normal equations are singular".to_string())
        })?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        self.coefficients = coefficients;
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    fn name(&self) -> &'static str {
        "linear_regression"
    }
}

/// Reject empty or ragged training data
pub(crate) fn check_shapes(x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    if x.is_empty() || x.len() != y.len() {
        return Err(NbaError::InsufficientData {
            what: "training rows".to_string(),
            have: x.len().min(y.len()),
            need: 1,
        });
    }
    let dim = x[0].len();
    if x.iter().any(|row| row.len() != dim) {
        return Err(NbaError::InvalidArgument(
            "Feature rows have different widths".to_string(),
        ));
    }
    Ok(())
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-15 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
