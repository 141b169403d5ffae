//! CSV export of record-oriented outputs

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::features::{StatisticBundle, SummaryReport};
use crate::Result;

/// A statistic bundle labelled with the attribute it describes
#[derive(Debug, Clone, Serialize)]
pub struct BundleRow {
    pub stat: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<f64>,
    pub mode_count: usize,
    pub standard_deviation: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub percentage_below_mean: Option<f64>,
    pub percentage_below_median: Option<f64>,
    pub percentage_below_mode: Option<f64>,
}

impl BundleRow {
    pub fn new(stat: &str, bundle: &StatisticBundle) -> Self {
        BundleRow {
            stat: stat.to_string(),
            count: bundle.count,
            mean: bundle.mean,
            median: bundle.median,
            mode: bundle.mode,
            mode_count: bundle.mode_count,
            standard_deviation: bundle.standard_deviation,
            min: bundle.min,
            max: bundle.max,
            percentage_below_mean: bundle.percentage_below_mean,
            percentage_below_median: bundle.percentage_below_median,
            percentage_below_mode: bundle.percentage_below_mode,
        }
    }
}

/// Serialise rows with a header line to any writer
pub fn write_csv<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

/// Write `rows` to `<dir>/<name>.csv`, creating the directory
pub fn export_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let file_name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{}.csv", file_name));

    let file = std::fs::File::create(&path)?;
    write_csv(file, rows)?;
    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

pub fn export_summary(dir: &Path, name: &str, report: &SummaryReport) -> Result<PathBuf> {
    export_csv(dir, name, std::slice::from_ref(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{describe, SeasonSummary};
    use crate::GameRecord;
    use chrono::NaiveDate;

    #[test]
    fn test_export_games() {
        let dir = tempfile::tempdir().unwrap();
        let mut game = GameRecord::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            "NOP vs. MEM",
            true,
            110,
        );
        game.plus_minus = Some(7.0);

        let path = export_csv(dir.path(), "NOP games 2023-24", &[game]).unwrap();
        assert_eq!(path.file_name().unwrap(), "NOP_games_2023-24.csv");

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("game_id,date,matchup,opponent,location,win,points"));
        let row = lines.next().unwrap();
        assert!(row.contains("2024-02-01"));
        assert!(row.contains("home"));
        assert!(row.ends_with(",7.0"));
    }

    #[test]
    fn test_export_bundles_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            BundleRow::new("points", &describe(&[100.0, 110.0, 120.0])),
            BundleRow::new("assists", &describe(&[])),
        ];
        let path = export_csv(dir.path(), "bundles", &rows).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().nth(1).unwrap().starts_with("points,3,110.0"));

        let report = SeasonSummary::new().report();
        let path = export_summary(dir.path(), "summary", &report).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 2);
    }
}
