//! Feature engineering over a player's season history
//!
//! Turns time-ordered career rows into one feature vector per season:
//! shooting splits, per-game rates, rolling means of the scoring rate and
//! a couple of interaction terms.

use serde::{Deserialize, Serialize};

use super::numeric::{mean, ratio};
use super::rolling::{fill_gaps, rolling_mean};
use crate::{NbaError, Result, Season, SeasonRecord};

/// Base columns of which at least this many must be present
pub const MIN_BASE_COLUMNS: usize = 3;

/// One row of engineered features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub season: Season,
    pub values: Vec<f64>,
}

/// Engineered features for a whole history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonFeatures {
    pub names: Vec<String>,
    pub rows: Vec<FeatureVector>,
    /// Points per game for each season (the modelled rate)
    pub rates: Vec<f64>,
    pub games_played: Vec<f64>,
}

impl SeasonFeatures {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }
}

struct Column {
    name: String,
    values: Vec<f64>,
}

/// Optional per-season value, gap-filled; `None` when the column is absent everywhere
fn optional_column(
    name: &str,
    records: &[SeasonRecord],
    get: impl Fn(&SeasonRecord) -> Option<f64>,
) -> Option<Column> {
    let raw: Vec<Option<f64>> = records.iter().map(&get).collect();
    fill_gaps(&raw).map(|values| Column {
        name: name.to_string(),
        values,
    })
}

/// Build the feature matrix for a time-ordered season history
pub fn engineer(records: &[SeasonRecord], windows: &[usize]) -> Result<SeasonFeatures> {
    if records.is_empty() {
        return Err(NbaError::InsufficientData {
            what: "season history".to_string(),
            have: 0,
            need: 1,
        });
    }

    let per_game = |value: Option<f64>, r: &SeasonRecord| {
        value.and_then(|v| ratio(v, r.games_played as f64))
    };

    let base = [
        optional_column("fg_pct", records, |r| r.fg_pct),
        optional_column("fg3_pct", records, |r| r.fg3_pct),
        optional_column("ft_pct", records, |r| r.ft_pct),
        optional_column("rebounds_per_game", records, |r| per_game(r.rebounds, r)),
        optional_column("assists_per_game", records, |r| per_game(r.assists, r)),
    ];
    let base_names = ["FG_PCT", "FG3_PCT", "FT_PCT", "REB", "AST"];

    let available = base.iter().filter(|c| c.is_some()).count();
    if available < MIN_BASE_COLUMNS {
        let missing = base
            .iter()
            .zip(base_names)
            .filter(|(c, _)| c.is_none())
            .map(|(_, name)| name)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(NbaError::MissingRequiredColumn {
            column: missing,
            table: "season totals".to_string(),
        });
    }

    let raw_rates: Vec<Option<f64>> = records.iter().map(|r| r.points_per_game()).collect();
    let rates = fill_gaps(&raw_rates).ok_or_else(|| NbaError::InsufficientData {
        what: "seasons with games played".to_string(),
        have: 0,
        need: 1,
    })?;
    let games_played: Vec<f64> = records.iter().map(|r| r.games_played as f64).collect();

    let mut columns: Vec<Column> = base.into_iter().flatten().collect();
    columns.push(Column {
        name: "games_played".to_string(),
        values: games_played.clone(),
    });

    // Windows longer than the history have nothing to fill from
    let overall_rate = mean(&rates).unwrap_or_default();
    for &window in windows {
        let rolled = fill_gaps(&rolling_mean(&rates, window))
            .unwrap_or_else(|| vec![overall_rate; rates.len()]);
        columns.push(Column {
            name: format!("ppg_rolling_{}", window),
            values: rolled,
        });
    }

    let efficiency: Option<Vec<f64>> = columns
        .iter()
        .find(|c| c.name == "fg_pct")
        .map(|fg| fg.values.iter().zip(&rates).map(|(f, r)| f * r).collect());
    if let Some(efficiency) = efficiency {
        columns.push(Column {
            name: "scoring_efficiency".to_string(),
            values: efficiency,
        });
    }

    let usage = records
        .iter()
        .zip(&rates)
        .map(|(r, rate)| {
            ratio(r.points + r.assists.unwrap_or(0.0), r.games_played as f64).unwrap_or(*rate)
        })
        .collect();
    columns.push(Column {
        name: "usage".to_string(),
        values: usage,
    });

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, r)| FeatureVector {
            season: r.season.clone(),
            values: columns.iter().map(|c| c.values[i]).collect(),
        })
        .collect();

    Ok(SeasonFeatures {
        names: columns.into_iter().map(|c| c.name).collect(),
        rows,
        rates,
        games_played,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(ppg: &[f64]) -> Vec<SeasonRecord> {
        ppg.iter()
            .enumerate()
            .map(|(i, rate)| {
                let mut r = SeasonRecord::new(Season::from_start_year(2015 + i as i32), 70, rate * 70.0);
                r.fg_pct = Some(0.45);
                r.fg3_pct = Some(0.35);
                r.ft_pct = Some(0.8);
                r.rebounds = Some(350.0);
                r.assists = Some(210.0);
                r
            })
            .collect()
    }

    #[test]
    fn test_engineer_shapes() {
        let features = engineer(&history(&[10.0, 12.0, 11.0, 13.0, 12.0, 14.0]), &[2, 3, 5]).unwrap();
        assert_eq!(features.len(), 6);
        // 5 base + games + 3 rolling + efficiency + usage
        assert_eq!(features.dim(), 11);
        assert!(features.rows.iter().all(|r| r.values.len() == features.dim()));
        assert!(features.rows.iter().flat_map(|r| &r.values).all(|v| v.is_finite()));
        assert!((features.rates[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_start_is_back_filled() {
        let features = engineer(&history(&[10.0, 12.0, 11.0, 13.0, 12.0, 14.0]), &[3]).unwrap();
        let idx = features.names.iter().position(|n| n == "ppg_rolling_3").unwrap();
        let col: Vec<f64> = features.rows.iter().map(|r| r.values[idx]).collect();
        assert!((col[0] - 11.0).abs() < 1e-9);
        assert!((col[1] - 11.0).abs() < 1e-9);
        assert!((col[2] - 11.0).abs() < 1e-9);
        assert!((col[5] - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_columns_are_filled() {
        let mut records = history(&[10.0, 12.0, 11.0, 13.0, 12.0]);
        records[0].fg3_pct = None;
        records[4].fg3_pct = None;
        let features = engineer(&records, &[2]).unwrap();
        let idx = features.names.iter().position(|n| n == "fg3_pct").unwrap();
        assert_eq!(features.rows[0].values[idx], 0.35);
        assert_eq!(features.rows[4].values[idx], 0.35);
    }

    #[test]
    fn test_missing_base_columns() {
        let records: Vec<SeasonRecord> = (0..5)
            .map(|i| SeasonRecord::new(Season::from_start_year(2015 + i), 60, 600.0))
            .collect();
        let err = engineer(&records, &[2]).unwrap_err();
        assert!(matches!(err, NbaError::MissingRequiredColumn { .. }));
    }
}
