//! Season summaries and game-log splits
//!
//! Win/loss and home/away aggregation over one entity's games in a season.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::numeric::{mean, ratio};
use super::rolling::rolling_mean;
use crate::{GameRecord, Location, NbaError, Result};

/// Numeric attribute of a game record that can be described or charted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStat {
    Points,
    Rebounds,
    Assists,
    Minutes,
    Steals,
    Blocks,
    Turnovers,
    PlusMinus,
    FieldGoalsMade,
    ThreesMade,
    FreeThrowsMade,
}

impl GameStat {
    pub const ALL: [GameStat; 11] = [
        GameStat::Points,
        GameStat::Rebounds,
        GameStat::Assists,
        GameStat::Steals,
        GameStat::Blocks,
        GameStat::Minutes,
        GameStat::Turnovers,
        GameStat::PlusMinus,
        GameStat::FieldGoalsMade,
        GameStat::ThreesMade,
        GameStat::FreeThrowsMade,
    ];

    /// Value for one game, `None` when the provider omitted the column
    pub fn value(&self, game: &GameRecord) -> Option<f64> {
        match self {
            GameStat::Points => Some(game.points as f64),
            GameStat::Rebounds => game.rebounds.map(f64::from),
            GameStat::Assists => game.assists.map(f64::from),
            GameStat::Steals => game.steals.map(f64::from),
            GameStat::Blocks => game.blocks.map(f64::from),
            GameStat::Minutes => game.minutes,
            GameStat::Turnovers => game.turnovers.map(f64::from),
            GameStat::PlusMinus => game.plus_minus,
            GameStat::FieldGoalsMade => game.field_goals_made.map(f64::from),
            GameStat::ThreesMade => game.threes_made.map(f64::from),
            GameStat::FreeThrowsMade => game.free_throws_made.map(f64::from),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameStat::Points => "points",
            GameStat::Rebounds => "rebounds",
            GameStat::Assists => "assists",
            GameStat::Steals => "steals",
            GameStat::Blocks => "blocks",
            GameStat::Minutes => "minutes",
            GameStat::Turnovers => "turnovers",
            GameStat::PlusMinus => "plus_minus",
            GameStat::FieldGoalsMade => "field_goals_made",
            GameStat::ThreesMade => "threes_made",
            GameStat::FreeThrowsMade => "free_throws_made",
        }
    }
}

impl fmt::Display for GameStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for GameStat {
    type Err = NbaError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "pts" => return Ok(GameStat::Points),
            "reb" => return Ok(GameStat::Rebounds),
            "ast" => return Ok(GameStat::Assists),
            "min" => return Ok(GameStat::Minutes),
            "stl" => return Ok(GameStat::Steals),
            "blk" => return Ok(GameStat::Blocks),
            "tov" => return Ok(GameStat::Turnovers),
            _ => {}
        }
        GameStat::ALL
            .into_iter()
            .find(|stat| stat.name() == key)
            .ok_or_else(|| NbaError::InvalidArgument(format!("Unknown statistic: {}", s)))
    }
}

/// Samples of one attribute, skipping games where it is absent
pub fn samples(games: &[GameRecord], stat: GameStat) -> Vec<f64> {
    games.iter().filter_map(|g| stat.value(g)).collect()
}

/// Running total of a count that some games may not report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: u64,
    /// Games that reported the count
    pub games: usize,
}

impl Tally {
    pub fn add(&mut self, value: Option<u32>) {
        if let Some(v) = value {
            self.total += v as u64;
            self.games += 1;
        }
    }

    /// Average over the reporting games, `None` when none reported
    pub fn per_game(&self) -> Option<f64> {
        ratio(self.total as f64, self.games as f64)
    }
}

/// Made/attempted totals over games that report both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shooting {
    pub made: Tally,
    pub attempted: Tally,
}

impl Shooting {
    pub fn add(&mut self, made: Option<u32>, attempted: Option<u32>) {
        if let (Some(m), Some(a)) = (made, attempted) {
            self.made.add(Some(m));
            self.attempted.add(Some(a));
        }
    }

    pub fn pct(&self) -> Option<f64> {
        ratio(self.made.total as f64, self.attempted.total as f64)
    }
}

/// Aggregate of one entity's season
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub games_played: usize,
    pub wins: usize,
    pub losses: usize,
    pub home_games: usize,
    pub home_wins: usize,
    pub away_games: usize,
    pub away_wins: usize,
    pub points: u64,
    pub rebounds: Tally,
    pub assists: Tally,
    pub steals: Tally,
    pub blocks: Tally,
    pub turnovers: Tally,
    pub field_goals: Shooting,
    pub threes: Shooting,
    pub free_throws: Shooting,
    minutes: Vec<f64>,
    plus_minus: Vec<f64>,
}

impl SeasonSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarize a full game log
    pub fn from_games(games: &[GameRecord]) -> Self {
        let mut summary = Self::new();
        for game in games {
            summary.update(game);
        }
        summary
    }

    /// Update the summary with one game
    pub fn update(&mut self, game: &GameRecord) {
        self.games_played += 1;
        if game.win {
            self.wins += 1;
        } else {
            self.losses += 1;
        }

        match game.location {
            Location::Home => {
                self.home_games += 1;
                if game.win {
                    self.home_wins += 1;
                }
            }
            Location::Away => {
                self.away_games += 1;
                if game.win {
                    self.away_wins += 1;
                }
            }
        }

        self.points += game.points as u64;
        self.rebounds.add(game.rebounds);
        self.assists.add(game.assists);
        self.steals.add(game.steals);
        self.blocks.add(game.blocks);
        self.turnovers.add(game.turnovers);
        self.field_goals.add(game.field_goals_made, game.field_goals_attempted);
        self.threes.add(game.threes_made, game.threes_attempted);
        self.free_throws.add(game.free_throws_made, game.free_throws_attempted);

        if let Some(min) = game.minutes {
            self.minutes.push(min);
        }
        if let Some(pm) = game.plus_minus {
            self.plus_minus.push(pm);
        }
    }

    /// Win percentage (0-1)
    pub fn win_pct(&self) -> Option<f64> {
        ratio(self.wins as f64, self.games_played as f64)
    }

    pub fn home_win_pct(&self) -> Option<f64> {
        ratio(self.home_wins as f64, self.home_games as f64)
    }

    pub fn away_win_pct(&self) -> Option<f64> {
        ratio(self.away_wins as f64, self.away_games as f64)
    }

    pub fn points_per_game(&self) -> Option<f64> {
        ratio(self.points as f64, self.games_played as f64)
    }

    /// Box-score averages cover only the games that reported the column
    pub fn rebounds_per_game(&self) -> Option<f64> {
        self.rebounds.per_game()
    }

    pub fn assists_per_game(&self) -> Option<f64> {
        self.assists.per_game()
    }

    pub fn steals_per_game(&self) -> Option<f64> {
        self.steals.per_game()
    }

    pub fn blocks_per_game(&self) -> Option<f64> {
        self.blocks.per_game()
    }

    pub fn turnovers_per_game(&self) -> Option<f64> {
        self.turnovers.per_game()
    }

    pub fn minutes_per_game(&self) -> Option<f64> {
        mean(&self.minutes)
    }

    /// Average point differential, `None` when the provider omitted plus/minus
    pub fn avg_point_differential(&self) -> Option<f64> {
        mean(&self.plus_minus)
    }

    pub fn fg_pct(&self) -> Option<f64> {
        self.field_goals.pct()
    }

    pub fn fg3_pct(&self) -> Option<f64> {
        self.threes.pct()
    }

    pub fn ft_pct(&self) -> Option<f64> {
        self.free_throws.pct()
    }

    /// Flatten into the record-oriented view returned to callers
    pub fn report(&self) -> SummaryReport {
        SummaryReport {
            games_played: self.games_played,
            wins: self.wins,
            losses: self.losses,
            win_pct: self.win_pct(),
            home_games: self.home_games,
            home_wins: self.home_wins,
            home_win_pct: self.home_win_pct(),
            away_games: self.away_games,
            away_wins: self.away_wins,
            away_win_pct: self.away_win_pct(),
            points_per_game: self.points_per_game(),
            rebounds_per_game: self.rebounds_per_game(),
            assists_per_game: self.assists_per_game(),
            steals_per_game: self.steals_per_game(),
            blocks_per_game: self.blocks_per_game(),
            turnovers_per_game: self.turnovers_per_game(),
            minutes_per_game: self.minutes_per_game(),
            fg_pct: self.fg_pct(),
            fg3_pct: self.fg3_pct(),
            ft_pct: self.ft_pct(),
            avg_point_differential: self.avg_point_differential(),
        }
    }
}

/// Derived season figures, one flat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub games_played: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_pct: Option<f64>,
    pub home_games: usize,
    pub home_wins: usize,
    pub home_win_pct: Option<f64>,
    pub away_games: usize,
    pub away_wins: usize,
    pub away_win_pct: Option<f64>,
    pub points_per_game: Option<f64>,
    pub rebounds_per_game: Option<f64>,
    pub assists_per_game: Option<f64>,
    pub steals_per_game: Option<f64>,
    pub blocks_per_game: Option<f64>,
    pub turnovers_per_game: Option<f64>,
    pub minutes_per_game: Option<f64>,
    pub fg_pct: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub ft_pct: Option<f64>,
    pub avg_point_differential: Option<f64>,
}

/// Home/away partition of a game log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeAwaySplit {
    pub home_count: usize,
    pub away_count: usize,
    pub home_wins: usize,
    pub away_wins: usize,
    pub home_points_avg: Option<f64>,
    pub away_points_avg: Option<f64>,
}

/// Partition games into home and away
pub fn split_home_away(games: &[GameRecord]) -> HomeAwaySplit {
    let (home, away): (Vec<&GameRecord>, Vec<&GameRecord>) =
        games.iter().partition(|g| g.location == Location::Home);

    let points = |side: &[&GameRecord]| {
        let values: Vec<f64> = side.iter().map(|g| g.points as f64).collect();
        mean(&values)
    };

    HomeAwaySplit {
        home_count: home.len(),
        away_count: away.len(),
        home_wins: home.iter().filter(|g| g.win).count(),
        away_wins: away.iter().filter(|g| g.win).count(),
        home_points_avg: points(&home),
        away_points_avg: points(&away),
    }
}

/// Games against one opponent (case-insensitive abbreviation match)
pub fn filter_by_opponent(games: &[GameRecord], opponent: &str) -> Result<Vec<GameRecord>> {
    let code = opponent.trim().to_uppercase();
    if code.is_empty() {
        return Err(NbaError::InvalidArgument(
            "Opponent filter must not be empty".to_string(),
        ));
    }

    let matches: Vec<GameRecord> = games
        .iter()
        .filter(|g| g.opponent.eq_ignore_ascii_case(&code))
        .cloned()
        .collect();

    if matches.is_empty() {
        return Err(NbaError::NotFound(format!("No games against {}", code)));
    }
    Ok(matches)
}

/// One outcome in provider order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLossPoint {
    pub date: NaiveDate,
    pub win: bool,
}

/// Win/loss outcomes in the order the provider returned them
pub fn win_loss_series(games: &[GameRecord]) -> Vec<WinLossPoint> {
    games
        .iter()
        .map(|g| WinLossPoint {
            date: g.date,
            win: g.win,
        })
        .collect()
}

/// Streak figures over a win/loss series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub longest_win: usize,
    pub longest_loss: usize,
    /// Positive for a running win streak, negative for a losing one
    pub current: i64,
}

pub fn streaks(series: &[WinLossPoint]) -> Streaks {
    let mut result = Streaks::default();
    let mut run: i64 = 0;

    for point in series {
        run = match (point.win, run) {
            (true, r) if r > 0 => r + 1,
            (true, _) => 1,
            (false, r) if r < 0 => r - 1,
            (false, _) => -1,
        };
        if run > 0 {
            result.longest_win = result.longest_win.max(run as usize);
        } else {
            result.longest_loss = result.longest_loss.max(run.unsigned_abs() as usize);
        }
    }

    result.current = run;
    result
}

/// One chart point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chart series of one attribute; games missing the attribute are skipped
pub fn stat_series(games: &[GameRecord], stat: GameStat) -> Vec<SeriesPoint> {
    games
        .iter()
        .filter_map(|g| {
            stat.value(g).map(|value| SeriesPoint {
                date: g.date,
                value,
            })
        })
        .collect()
}

/// Running win percentage after each game
pub fn running_win_pct(games: &[GameRecord]) -> Vec<SeriesPoint> {
    let mut wins = 0usize;
    games
        .iter()
        .enumerate()
        .map(|(i, g)| {
            if g.win {
                wins += 1;
            }
            SeriesPoint {
                date: g.date,
                value: wins as f64 / (i + 1) as f64,
            }
        })
        .collect()
}

/// Moving average of one attribute, starting at the first full window
pub fn rolling_series(games: &[GameRecord], stat: GameStat, window: usize) -> Vec<SeriesPoint> {
    let points = stat_series(games, stat);
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    points
        .iter()
        .zip(rolling_mean(&values, window))
        .filter_map(|(p, avg)| {
            avg.map(|value| SeriesPoint {
                date: p.date,
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game(day: u32, matchup: &str, win: bool, points: u32) -> GameRecord {
        GameRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            matchup,
            win,
            points,
        )
    }

    fn sample_log() -> Vec<GameRecord> {
        vec![
            make_game(1, "NOP vs. MEM", true, 110),
            make_game(3, "NOP @ LAL", false, 98),
            make_game(5, "NOP @ MEM", true, 121),
            make_game(7, "NOP vs. BOS", false, 102),
            make_game(9, "NOP vs. LAL", true, 117),
            make_game(11, "broken matchup", false, 90),
        ]
    }

    #[test]
    fn test_season_summary() {
        let summary = SeasonSummary::from_games(&sample_log());
        assert_eq!(summary.games_played, 6);
        assert_eq!(summary.wins, 3);
        assert_eq!(summary.losses, 3);
        assert_eq!(summary.home_games, 3);
        assert_eq!(summary.home_wins, 2);
        assert_eq!(summary.away_wins, 1);
        assert_eq!(summary.win_pct(), Some(0.5));
        // No shot attempts recorded
        assert_eq!(summary.fg_pct(), None);
        assert_eq!(summary.avg_point_differential(), None);
    }

    #[test]
    fn test_unreported_box_score_stays_empty() {
        let games = sample_log();
        let summary = SeasonSummary::from_games(&games);
        assert_eq!(summary.rebounds_per_game(), None);
        assert_eq!(summary.assists_per_game(), None);
        assert_eq!(summary.steals_per_game(), None);
        assert!(samples(&games, GameStat::Rebounds).is_empty());
        assert_eq!(summary.report().rebounds_per_game, None);
    }

    #[test]
    fn test_partial_box_score_averages_reporting_games() {
        let mut games = sample_log();
        games[0].rebounds = Some(44);
        games[1].rebounds = Some(50);
        games[0].blocks = Some(7);
        games[0].field_goals_made = Some(40);
        games[0].field_goals_attempted = Some(80);
        // Attempts without makes are left out of the percentage
        games[1].field_goals_attempted = Some(90);

        let summary = SeasonSummary::from_games(&games);
        assert_eq!(summary.rebounds_per_game(), Some(47.0));
        assert_eq!(summary.rebounds.games, 2);
        assert_eq!(summary.blocks_per_game(), Some(7.0));
        assert_eq!(summary.fg_pct(), Some(0.5));
        assert_eq!(samples(&games, GameStat::Rebounds), vec![44.0, 50.0]);
    }

    #[test]
    fn test_empty_summary_has_no_ratios() {
        let report = SeasonSummary::from_games(&[]).report();
        assert_eq!(report.games_played, 0);
        assert_eq!(report.win_pct, None);
        assert_eq!(report.points_per_game, None);
    }

    #[test]
    fn test_split_home_away_partitions_everything() {
        let games = sample_log();
        let split = split_home_away(&games);
        assert_eq!(split.home_count + split.away_count, games.len());
        assert_eq!(split.home_count, 3);
        // The malformed matchup counts as away
        assert_eq!(split.away_count, 3);
        assert_eq!(split.home_points_avg, Some((110.0 + 102.0 + 117.0) / 3.0));
    }

    #[test]
    fn test_filter_by_opponent() {
        let games = sample_log();
        let vs_mem = filter_by_opponent(&games, "mem").unwrap();
        assert_eq!(vs_mem.len(), 2);

        assert!(matches!(
            filter_by_opponent(&games, "CHI"),
            Err(NbaError::NotFound(_))
        ));
        assert!(matches!(
            filter_by_opponent(&games, "  "),
            Err(NbaError::InvalidArgument(_))
        ));
        assert!(matches!(
            filter_by_opponent(&[], "MEM"),
            Err(NbaError::NotFound(_))
        ));
    }

    #[test]
    fn test_win_loss_series_keeps_order() {
        let games = sample_log();
        let series = win_loss_series(&games);
        let outcomes: Vec<bool> = series.iter().map(|p| p.win).collect();
        assert_eq!(outcomes, vec![true, false, true, false, true, false]);
        assert_eq!(series[0].date, games[0].date);
    }

    #[test]
    fn test_streaks() {
        let games: Vec<GameRecord> = [true, true, true, false, true, false, false]
            .iter()
            .enumerate()
            .map(|(i, w)| make_game(i as u32 + 1, "NOP vs. UTA", *w, 100))
            .collect();
        let s = streaks(&win_loss_series(&games));
        assert_eq!(s.longest_win, 3);
        assert_eq!(s.longest_loss, 2);
        assert_eq!(s.current, -2);
    }

    #[test]
    fn test_series_skip_missing_values() {
        let mut games = sample_log();
        games[0].plus_minus = Some(12.0);
        assert_eq!(stat_series(&games, GameStat::PlusMinus).len(), 1);
        assert_eq!(stat_series(&games, GameStat::Points).len(), games.len());

        let running = running_win_pct(&games);
        assert_eq!(running[0].value, 1.0);
        assert_eq!(running[1].value, 0.5);
    }

    #[test]
    fn test_rolling_series() {
        let series = rolling_series(&sample_log(), GameStat::Points, 3);
        assert_eq!(series.len(), 4);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert!((series[0].value - 329.0 / 3.0).abs() < 1e-9);
        assert!(rolling_series(&sample_log(), GameStat::Points, 10).is_empty());
    }

    #[test]
    fn test_game_stat_parsing() {
        assert_eq!("PTS".parse::<GameStat>().unwrap(), GameStat::Points);
        assert_eq!("plus-minus".parse::<GameStat>().unwrap(), GameStat::PlusMinus);
        assert_eq!("BLK".parse::<GameStat>().unwrap(), GameStat::Blocks);
        assert_eq!("steals".parse::<GameStat>().unwrap(), GameStat::Steals);
        assert!("height".parse::<GameStat>().is_err());
    }
}
