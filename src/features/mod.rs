//! Descriptive statistics and feature extraction
//!
//! Converts raw game and season records into statistic bundles, splits,
//! chart series and model-ready feature vectors.

pub mod describe;
pub mod numeric;
pub mod rolling;
pub mod season;
pub mod summary;

pub use describe::{describe, percentage_below, StatisticBundle};
pub use numeric::{ratio, round_to};
pub use season::{FeatureVector, SeasonFeatures};
pub use summary::{
    filter_by_opponent, split_home_away, streaks, win_loss_series, GameStat, HomeAwaySplit,
    SeasonSummary, SeriesPoint, Streaks, SummaryReport, WinLossPoint,
};
