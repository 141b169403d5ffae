//! Model training
//!
//! Regressors, feature scaling, data partitioning and evaluation metrics.

pub mod linear;
pub mod metrics;
pub mod scaler;
pub mod split;
pub mod tree;

pub use linear::LinearRegression;
pub use metrics::{
    auc, r2_score, roc_curve, ConfusionMatrix, CrossValidationMetrics, RegressionMetrics,
    RocPoint,
};
pub use scaler::StandardScaler;
pub use split::{fold_count, k_fold, train_test_split, Fold};
pub use tree::{GradientBoosting, RandomForest, RegressionTree};

use crate::Result;

/// A model mapping feature rows to one continuous target
pub trait Regressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    fn predict(&self, row: &[f64]) -> f64;

    fn name(&self) -> &'static str;

    fn predict_all(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }
}
