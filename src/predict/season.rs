//! Next-season scoring forecast from a player's career history

use serde::{Deserialize, Serialize};

use crate::features::numeric::{mean, sample_std};
use crate::features::season::engineer;
use crate::training::split::select;
use crate::training::{
    fold_count, k_fold, CrossValidationMetrics, GradientBoosting, RandomForest,
    RegressionMetrics, Regressor, StandardScaler,
};
use crate::{ForecastConfig, NbaError, Result, Season, SeasonRecord};

pub const MODEL_IDENTIFIER: &str = "random_forest+gradient_boosting";

/// Point forecast plus cross-validated error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Season being forecast
    pub season: Season,
    /// Projected season total
    pub predicted_value: f64,
    /// Projected points per game
    pub predicted_rate: f64,
    pub error_metrics: RegressionMetrics,
    pub model_identifier: String,
    pub folds: usize,
    pub seasons_used: usize,
}

/// The two tree models whose predictions are averaged
struct Ensemble {
    forest: RandomForest,
    boosting: GradientBoosting,
}

impl Ensemble {
    fn new(config: &ForecastConfig) -> Self {
        Ensemble {
            forest: RandomForest::new(config.n_trees, config.max_depth, config.seed),
            boosting: GradientBoosting::new(config.boosting_rounds, config.learning_rate, 3),
        }
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.forest.fit(x, y)?;
        self.boosting.fit(x, y)
    }

    fn predict(&self, row: &[f64]) -> f64 {
        (self.forest.predict(row) + self.boosting.predict(row)) / 2.0
    }
}

/// Forecast the season after the last record
///
/// `records` must be in chronological order. Features of each season are
/// paired with the scoring rate of the season that follows it.
pub fn forecast_season(records: &[SeasonRecord], config: &ForecastConfig) -> Result<ForecastResult> {
    if records.len() < config.min_seasons {
        return Err(NbaError::InsufficientData {
            what: "season rows".to_string(),
            have: records.len(),
            need: config.min_seasons,
        });
    }

    let features = engineer(records, &config.rolling_windows)?;

    let std = sample_std(&features.rates).unwrap_or(0.0);
    if std < config.min_target_std {
        return Err(NbaError::LowVariance {
            std,
            threshold: config.min_target_std,
        });
    }

    let scaler = StandardScaler::fit(&features.matrix());
    let scaled = scaler.transform_all(&features.matrix());

    let n_pairs = scaled.len() - 1;
    let x: Vec<Vec<f64>> = scaled[..n_pairs].to_vec();
    let y: Vec<f64> = features.rates[1..].to_vec();

    let k = fold_count(n_pairs, config.max_folds);
    let folds = k_fold(n_pairs, k)?;

    let mut cv = CrossValidationMetrics::new();
    for (i, fold) in folds.iter().enumerate() {
        let mut model = Ensemble::new(config);
        model.fit(&select(&x, &fold.train), &select(&y, &fold.train))?;

        let actual = select(&y, &fold.test);
        let predicted: Vec<f64> = fold.test.iter().map(|&t| model.predict(&x[t])).collect();
        if let Some(metrics) = RegressionMetrics::compute(&actual, &predicted) {
            log::debug!("Fold {}/{}: {}", i + 1, k, metrics);
            cv.update(&metrics);
        }
    }
    let error_metrics = cv.summary().ok_or_else(|| NbaError::InsufficientData {
        what: "evaluated folds".to_string(),
        have: 0,
        need: 1,
    })?;

    let mut model = Ensemble::new(config);
    model.fit(&x, &y)?;
    let latest = &scaled[scaled.len() - 1];
    let predicted_rate = model.predict(latest);

    let avg_games = mean(&features.games_played).unwrap_or_default();
    let last_season = &records[records.len() - 1].season;

    log::info!(
        "Forecast {}: {:.2} per game over {:.1} games ({})",
        last_season.next(),
        predicted_rate,
        avg_games,
        cv
    );

    Ok(ForecastResult {
        season: last_season.next(),
        predicted_value: predicted_rate * avg_games,
        predicted_rate,
        error_metrics,
        model_identifier: MODEL_IDENTIFIER.to_string(),
        folds: k,
        seasons_used: records.len(),
    })
}
