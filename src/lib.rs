//! NBA statistics and scoring forecasts
//!
//! Fetches per-game and per-season records from the stats provider, reshapes
//! them into descriptive statistics and splits, and forecasts next-season
//! scoring from a player's career history.

pub mod api;
pub mod cache;
pub mod data;
pub mod features;
pub mod predict;
pub mod service;
pub mod training;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Unique identifier for a team (provider team id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a player (provider person id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Either kind of entity the statistics are computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityId {
    Team(TeamId),
    Player(PlayerId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Team(id) => id.fmt(f),
            EntityId::Player(id) => id.fmt(f),
        }
    }
}

/// A season label in provider format, e.g. `2023-24`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season(String);

fn season_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("season pattern is valid"))
}

impl Season {
    /// Parse and validate a season label (`YYYY-YY`, consecutive years)
    pub fn parse(label: &str) -> Result<Self> {
        let label = label.trim();
        let caps = season_pattern()
            .captures(label)
            .ok_or_else(|| NbaError::InvalidArgument(format!("Invalid season: {}", label)))?;

        let start: i32 = caps[1]
            .parse()
            .map_err(|_| NbaError::InvalidArgument(format!("Invalid season: {}", label)))?;
        let end: i32 = caps[2]
            .parse()
            .map_err(|_| NbaError::InvalidArgument(format!("Invalid season: {}", label)))?;

        if (start + 1) % 100 != end {
            return Err(NbaError::InvalidArgument(format!(
                "Season years are not consecutive: {}",
                label
            )));
        }

        Ok(Season(label.to_string()))
    }

    /// Season starting in the given calendar year
    pub fn from_start_year(year: i32) -> Self {
        Season(format!("{}-{:02}", year, (year + 1) % 100))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar year the season starts in
    pub fn start_year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn previous(&self) -> Self {
        Self::from_start_year(self.start_year() - 1)
    }

    pub fn next(&self) -> Self {
        Self::from_start_year(self.start_year() + 1)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Season {
    type Error = NbaError;

    fn try_from(value: String) -> Result<Self> {
        Season::parse(&value)
    }
}

impl From<Season> for String {
    fn from(season: Season) -> Self {
        season.0
    }
}

impl std::str::FromStr for Season {
    type Err = NbaError;

    fn from_str(s: &str) -> Result<Self> {
        Season::parse(s)
    }
}

/// Conference a franchise plays in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Conference {
    East,
    West,
}

impl Conference {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "east" | "eastern" | "e" => Some(Conference::East),
            "west" | "western" | "w" => Some(Conference::West),
            _ => None,
        }
    }
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conference::East => write!(f, "East"),
            Conference::West => write!(f, "West"),
        }
    }
}

/// An NBA franchise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub abbreviation: String,
    pub name: String,
    pub conference: Conference,
}

/// Where a game was played from the entity's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Home,
    Away,
}

impl Location {
    /// Derive location from a provider matchup string (`NOP vs. MEM` or `NOP @ MEM`)
    ///
    /// Anything without the home marker is treated as away, including
    /// malformed strings.
    pub fn from_matchup(matchup: &str) -> Self {
        if matchup.to_lowercase().contains("vs.") {
            Location::Home
        } else {
            Location::Away
        }
    }
}

/// Opponent abbreviation from a matchup string, upper-cased
pub fn opponent_from_matchup(matchup: &str) -> String {
    let tail = matchup
        .rsplit_once("vs.")
        .or_else(|| matchup.rsplit_once('@'))
        .map(|(_, rest)| rest)
        .unwrap_or("");
    tail.trim().to_uppercase()
}

/// One played game for a team or player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: Option<String>,
    pub date: NaiveDate,
    pub matchup: String,
    pub opponent: String,
    pub location: Location,
    pub win: bool,
    pub points: u32,
    pub rebounds: Option<u32>,
    pub assists: Option<u32>,
    pub steals: Option<u32>,
    pub blocks: Option<u32>,
    pub minutes: Option<f64>,
    pub field_goals_made: Option<u32>,
    pub field_goals_attempted: Option<u32>,
    pub threes_made: Option<u32>,
    pub threes_attempted: Option<u32>,
    pub free_throws_made: Option<u32>,
    pub free_throws_attempted: Option<u32>,
    pub turnovers: Option<u32>,
    /// Point differential while on court (team: final margin)
    pub plus_minus: Option<f64>,
}

impl GameRecord {
    /// Create a record with only points known; location and opponent are
    /// derived from the matchup here and nowhere else.
    pub fn new(date: NaiveDate, matchup: &str, win: bool, points: u32) -> Self {
        GameRecord {
            game_id: None,
            date,
            matchup: matchup.to_string(),
            opponent: opponent_from_matchup(matchup),
            location: Location::from_matchup(matchup),
            win,
            points,
            rebounds: None,
            assists: None,
            steals: None,
            blocks: None,
            minutes: None,
            field_goals_made: None,
            field_goals_attempted: None,
            threes_made: None,
            threes_attempted: None,
            free_throws_made: None,
            free_throws_attempted: None,
            turnovers: None,
            plus_minus: None,
        }
    }

    pub fn is_home(&self) -> bool {
        self.location == Location::Home
    }
}

/// One season row of a player's career totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub season: Season,
    pub team: Option<String>,
    pub age: Option<f64>,
    pub games_played: u32,
    pub minutes: Option<f64>,
    /// Season total points
    pub points: f64,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
    pub fg_pct: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub ft_pct: Option<f64>,
}

impl SeasonRecord {
    pub fn new(season: Season, games_played: u32, points: f64) -> Self {
        SeasonRecord {
            season,
            team: None,
            age: None,
            games_played,
            minutes: None,
            points,
            rebounds: None,
            assists: None,
            fg_pct: None,
            fg3_pct: None,
            ft_pct: None,
        }
    }

    /// Points per game, `None` for a season without games
    pub fn points_per_game(&self) -> Option<f64> {
        features::ratio(self.points, self.games_played as f64)
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum NbaError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient data for {what}: have {have}, need at least {need}")]
    InsufficientData {
        what: String,
        have: usize,
        need: usize,
    },

    #[error("Too little variation to model meaningfully (std {std:.4} < {threshold})")]
    LowVariance { std: f64, threshold: f64 },

    #[error("Missing required column {column} in {table}")]
    MissingRequiredColumn { column: String, table: String },

    #[error("Upstream request to {endpoint} timed out after {attempts} attempts")]
    UpstreamTimeout { endpoint: String, attempts: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl NbaError {
    /// Stable identifier callers branch on
    pub fn kind(&self) -> &'static str {
        match self {
            NbaError::NotFound(_) => "not_found",
            NbaError::InsufficientData { .. } => "insufficient_data",
            NbaError::LowVariance { .. } => "low_variance",
            NbaError::MissingRequiredColumn { .. } => "missing_required_column",
            NbaError::UpstreamTimeout { .. } => "upstream_timeout",
            NbaError::InvalidArgument(_) => "invalid_argument",
            NbaError::Http(_) => "http",
            NbaError::Database(_) => "database",
            NbaError::Json(_) => "json",
            NbaError::Csv(_) => "csv",
            NbaError::Config(_) => "config",
            NbaError::Io(_) => "io",
            NbaError::Parse(_) => "parse",
        }
    }

    /// HTTP-equivalent status for the error kind
    pub fn status_code(&self) -> u16 {
        match self {
            NbaError::NotFound(_) => 404,
            NbaError::InvalidArgument(_) => 400,
            NbaError::InsufficientData { .. }
            | NbaError::LowVariance { .. }
            | NbaError::MissingRequiredColumn { .. } => 422,
            NbaError::UpstreamTimeout { .. } => 504,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, NbaError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub bulk: BulkConfig,
    pub cache: CacheConfig,
    pub forecast: ForecastConfig,
    pub linear: LinearConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub min_seasons: usize,
    pub min_target_std: f64,
    pub rolling_windows: Vec<usize>,
    pub max_folds: usize,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: usize,
    pub boosting_rounds: usize,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearConfig {
    pub test_size: f64,
    pub window: usize,
    pub min_games: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub export_dir: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            min_seasons: 5,
            min_target_std: 0.01,
            rolling_windows: vec![2, 3, 5],
            max_folds: 5,
            seed: 42,
            n_trees: 100,
            max_depth: 6,
            boosting_rounds: 100,
            learning_rate: 0.1,
        }
    }
}

impl Default for LinearConfig {
    fn default() -> Self {
        LinearConfig {
            test_size: 0.2,
            window: 5,
            min_games: 10,
            seed: 42,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "https://stats.nba.com/stats".to_string(),
                timeout_secs: 30,
                user_agent: "Mozilla/5.0 (X11; Linux x86_64) nba-stats/0.1".to_string(),
            },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 500,
                backoff_factor: 2,
            },
            bulk: BulkConfig { workers: 4 },
            cache: CacheConfig { capacity: 256 },
            forecast: ForecastConfig::default(),
            linear: LinearConfig::default(),
            data: DataConfig {
                database_path: "data/nba.db".to_string(),
                export_dir: "data/export".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NbaError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| NbaError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NbaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_parsing() {
        let season = Season::parse("2023-24").unwrap();
        assert_eq!(season.start_year(), 2023);
        assert_eq!(season.previous().as_str(), "2022-23");
        assert_eq!(Season::parse("1999-00").unwrap().next().as_str(), "2000-01");

        assert!(matches!(
            Season::parse("2023-25"),
            Err(NbaError::InvalidArgument(_))
        ));
        assert!(Season::parse("2023").is_err());
    }

    #[test]
    fn test_location_from_matchup() {
        assert_eq!(Location::from_matchup("NOP vs. MEM"), Location::Home);
        assert_eq!(Location::from_matchup("NOP @ MEM"), Location::Away);
        assert_eq!(Location::from_matchup("garbage"), Location::Away);
        assert_eq!(Location::from_matchup(""), Location::Away);
    }

    #[test]
    fn test_opponent_from_matchup() {
        assert_eq!(opponent_from_matchup("NOP vs. MEM"), "MEM");
        assert_eq!(opponent_from_matchup("NOP @ lal"), "LAL");
        assert_eq!(opponent_from_matchup("garbage"), "");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(NbaError::NotFound("x".into()).status_code(), 404);
        assert_eq!(NbaError::InvalidArgument("x".into()).status_code(), 400);
        assert_eq!(
            NbaError::LowVariance {
                std: 0.0,
                threshold: 0.01
            }
            .status_code(),
            422
        );
        assert_eq!(
            NbaError::UpstreamTimeout {
                endpoint: "playergamelog".into(),
                attempts: 3
            }
            .kind(),
            "upstream_timeout"
        );
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.forecast.rolling_windows, vec![2, 3, 5]);
        assert_eq!(parsed.retry.max_attempts, 3);
    }
}
