//! Per-game linear forecast of points, rebounds and assists
//!
//! Each game is described by the player's averages over the games just
//! before it. One least-squares model per target is trained on a seeded
//! split, scored both as a regression and as an above/below-average
//! classifier, then refitted to forecast the next game.

use serde::{Deserialize, Serialize};

use crate::features::numeric::mean;
use crate::features::rolling::{fill_gaps, trailing_mean};
use crate::training::split::select;
use crate::training::{
    auc, roc_curve, train_test_split, ConfusionMatrix, LinearRegression, RegressionMetrics,
    Regressor, RocPoint,
};
use crate::{GameRecord, LinearConfig, NbaError, Result};

/// Targets forecast by the linear variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearTarget {
    Points,
    Rebounds,
    Assists,
}

impl LinearTarget {
    pub const ALL: [LinearTarget; 3] = [
        LinearTarget::Points,
        LinearTarget::Rebounds,
        LinearTarget::Assists,
    ];

    fn value(&self, game: &GameRecord) -> Option<f64> {
        match self {
            LinearTarget::Points => Some(game.points as f64),
            LinearTarget::Rebounds => game.rebounds.map(f64::from),
            LinearTarget::Assists => game.assists.map(f64::from),
        }
    }
}

/// Evaluation and forecast for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetForecast {
    pub target: LinearTarget,
    pub predicted_value: f64,
    pub metrics: RegressionMetrics,
    /// Mean of the test targets, used to classify above/below average
    pub threshold: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: Option<f64>,
    /// Absent when the test split holds only one class
    pub roc_curve: Option<Vec<RocPoint>>,
    pub auc: Option<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearForecast {
    pub feature_names: Vec<String>,
    pub train_size: usize,
    pub test_size: usize,
    pub targets: Vec<TargetForecast>,
    pub model_identifier: String,
}

impl LinearForecast {
    pub fn target(&self, target: LinearTarget) -> Option<&TargetForecast> {
        self.targets.iter().find(|t| t.target == target)
    }
}

/// Raw per-game inputs averaged into features; `None` where the column is missing
fn feature_inputs(game: &GameRecord) -> [(&'static str, Option<f64>); 7] {
    [
        ("min_avg", game.minutes),
        ("fga_avg", game.field_goals_attempted.map(f64::from)),
        ("fg3a_avg", game.threes_attempted.map(f64::from)),
        ("fta_avg", game.free_throws_attempted.map(f64::from)),
        ("pts_avg", Some(game.points as f64)),
        ("reb_avg", game.rebounds.map(f64::from)),
        ("ast_avg", game.assists.map(f64::from)),
    ]
}

/// Feature columns, gap-filled; columns absent from every game are omitted
fn feature_columns(games: &[GameRecord]) -> Vec<(&'static str, Vec<f64>)> {
    let names: Vec<&'static str> = feature_inputs(&games[0]).iter().map(|(n, _)| *n).collect();
    names
        .iter()
        .enumerate()
        .filter_map(|(j, name)| {
            let raw: Vec<Option<f64>> = games.iter().map(|g| feature_inputs(g)[j].1).collect();
            fill_gaps(&raw).map(|values| (*name, values))
        })
        .collect()
}

/// Forecast the next game from a player's game log
///
/// Game order does not matter; records are sorted by date first.
pub fn forecast_linear(games: &[GameRecord], config: &LinearConfig) -> Result<LinearForecast> {
    let need = config.min_games.max(config.window + 2);
    if games.len() < need {
        return Err(NbaError::InsufficientData {
            what: "games".to_string(),
            have: games.len(),
            need,
        });
    }
    if config.window == 0 {
        return Err(NbaError::InvalidArgument("window must be positive".to_string()));
    }

    let mut games = games.to_vec();
    games.sort_by_key(|g| g.date);

    let columns = feature_columns(&games);
    let trailing: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|(_, values)| trailing_mean(values, config.window))
        .collect();

    // Rows start once a full window of history exists
    let rows: Vec<Vec<f64>> = (config.window..games.len())
        .map(|i| trailing.iter().map(|c| c[i].unwrap_or_default()).collect())
        .collect();
    let next_row: Vec<f64> = columns
        .iter()
        .map(|(_, values)| mean(&values[values.len() - config.window..]).unwrap_or_default())
        .collect();

    let split = train_test_split(rows.len(), config.test_size, config.seed)?;

    let mut targets = Vec::with_capacity(LinearTarget::ALL.len());
    for target in LinearTarget::ALL {
        let y: Vec<Option<f64>> = games[config.window..]
            .iter()
            .map(|g| target.value(g))
            .collect();

        // Rows whose target was not reported are left out of this target's fit
        let present = |indices: &[usize]| -> Vec<usize> {
            indices.iter().copied().filter(|&i| y[i].is_some()).collect()
        };
        let train = present(&split.train);
        let test = present(&split.test);
        let all = present(&(0..rows.len()).collect::<Vec<_>>());
        if train.is_empty() || test.is_empty() {
            log::debug!("{:?}: not reported in enough games, skipped", target);
            continue;
        }

        let y: Vec<f64> = y.iter().map(|v| v.unwrap_or_default()).collect();
        let x_train = select(&rows, &train);
        let x_test = select(&rows, &test);
        let y_train = select(&y, &train);
        let y_test = select(&y, &test);

        let mut model = LinearRegression::new();
        model.fit(&x_train, &y_train)?;
        let predicted = model.predict_all(&x_test);

        let metrics = RegressionMetrics::compute(&y_test, &predicted).ok_or_else(|| {
            NbaError::InsufficientData {
                what: "test rows".to_string(),
                have: 0,
                need: 1,
            }
        })?;
        let threshold = mean(&y_test).unwrap_or_default();
        let confusion_matrix = ConfusionMatrix::from_threshold(&y_test, &predicted, threshold);
        let labels: Vec<bool> = y_test.iter().map(|v| *v > threshold).collect();
        let roc = roc_curve(&labels, &predicted);
        let area = roc.as_deref().map(auc);

        // Refit on every row for the forecast itself
        let mut full = LinearRegression::new();
        full.fit(&select(&rows, &all), &select(&y, &all))?;
        let predicted_value = full.predict(&next_row).max(0.0);

        log::debug!("{:?}: {} | next game {:.2}", target, metrics, predicted_value);

        targets.push(TargetForecast {
            target,
            predicted_value,
            metrics,
            threshold,
            accuracy: confusion_matrix.accuracy(),
            confusion_matrix,
            roc_curve: roc,
            auc: area,
            coefficients: full.coefficients.clone(),
            intercept: full.intercept,
        });
    }

    Ok(LinearForecast {
        feature_names: columns.iter().map(|(n, _)| n.to_string()).collect(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        targets,
        model_identifier: LinearRegression::new().name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn game_log(n: usize) -> Vec<GameRecord> {
        (0..n)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap() + chrono::Duration::days(i as i64 * 2);
                let points = 15 + (i * 7 % 11) as u32;
                let mut g = GameRecord::new(date, "LAL vs. BOS", i % 2 == 0, points);
                g.rebounds = Some(4 + (i % 5) as u32);
                g.assists = Some(3 + (i * 3 % 4) as u32);
                g.minutes = Some(30.0 + (i % 6) as f64);
                g.field_goals_attempted = Some(10 + (i % 7) as u32);
                g.threes_attempted = Some(3 + (i % 3) as u32);
                g.free_throws_attempted = Some(2 + (i % 4) as u32);
                g
            })
            .collect()
    }

    #[test]
    fn test_linear_forecast_reports_every_target() {
        let games = game_log(40);
        let result = forecast_linear(&games, &LinearConfig::default()).unwrap();

        assert_eq!(result.feature_names.len(), 7);
        assert_eq!(result.train_size + result.test_size, 35);
        assert_eq!(result.test_size, 7);
        assert_eq!(result.targets.len(), 3);
        for t in &result.targets {
            assert!(t.metrics.mae.is_finite());
            assert_eq!(t.confusion_matrix.total(), 7);
            assert!(t.predicted_value >= 0.0);
            if let Some(area) = t.auc {
                assert!((0.0..=1.0).contains(&area));
            }
        }
        assert!(result.target(LinearTarget::Assists).is_some());
    }

    #[test]
    fn test_order_of_games_is_irrelevant() {
        let games = game_log(30);
        let mut reversed = games.clone();
        reversed.reverse();
        let a = forecast_linear(&games, &LinearConfig::default()).unwrap();
        let b = forecast_linear(&reversed, &LinearConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_minutes_are_omitted() {
        let games: Vec<GameRecord> = game_log(20)
            .into_iter()
            .map(|mut g| {
                g.minutes = None;
                g
            })
            .collect();
        let result = forecast_linear(&games, &LinearConfig::default()).unwrap();
        assert!(!result.feature_names.contains(&"min_avg".to_string()));
        assert_eq!(result.feature_names.len(), 6);
    }

    #[test]
    fn test_points_only_log_forecasts_points_only() {
        let games: Vec<GameRecord> = game_log(25)
            .into_iter()
            .map(|g| GameRecord::new(g.date, &g.matchup, g.win, g.points))
            .collect();
        let result = forecast_linear(&games, &LinearConfig::default()).unwrap();

        assert_eq!(result.feature_names, vec!["pts_avg".to_string()]);
        assert_eq!(result.targets.len(), 1);
        assert!(result.target(LinearTarget::Points).is_some());
        assert!(result.target(LinearTarget::Rebounds).is_none());
    }

    #[test]
    fn test_short_game_log() {
        assert!(matches!(
            forecast_linear(&game_log(6), &LinearConfig::default()),
            Err(NbaError::InsufficientData { need: 10, .. })
        ));
    }
}
