//! Entry points taking an entity, a season and optional filters
//!
//! Each call fetches records from the configured source, runs the
//! aggregation or forecast, and memoizes the result in a bounded cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cache::{CacheKey, CacheKind, CachedValue, StatsCache};
use crate::data::standings::rankings;
use crate::data::{bulk, teams, StandingRow, StatsSource};
use crate::features::describe::correlation;
use crate::features::summary::{rolling_series, running_win_pct, samples, stat_series};
use crate::features::{
    describe, filter_by_opponent, split_home_away, streaks, win_loss_series, GameStat,
    HomeAwaySplit, SeasonSummary, SeriesPoint, StatisticBundle, Streaks, SummaryReport,
    WinLossPoint,
};
use crate::predict::{forecast_linear, forecast_season, ForecastResult, LinearForecast};
use crate::{
    Conference, Config, EntityId, GameRecord, NbaError, PlayerId, Result, Season, Team, TeamId,
};

/// Win/loss totals and streaks for a team's season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResults {
    pub team: Team,
    pub season: Season,
    pub wins: usize,
    pub losses: usize,
    pub win_pct: Option<f64>,
    pub streaks: Streaks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinLossReport {
    pub series: Vec<WinLossPoint>,
    pub streaks: Streaks,
    pub running_win_pct: Vec<SeriesPoint>,
}

/// Games against one opponent plus their summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentReport {
    pub opponent: String,
    pub summary: SummaryReport,
    pub points: StatisticBundle,
    pub games: Vec<GameRecord>,
}

pub struct StatsService {
    source: Box<dyn StatsSource>,
    cache: StatsCache,
    config: Config,
}

impl StatsService {
    pub fn new(source: Box<dyn StatsSource>, config: Config) -> Self {
        StatsService {
            source,
            cache: StatsCache::new(config.cache.capacity),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    pub fn source(&self) -> &dyn StatsSource {
        self.source.as_ref()
    }

    pub fn games(&self, entity: EntityId, season: &Season) -> Result<Vec<GameRecord>> {
        self.source.game_log(entity, season)
    }

    // ==================== Teams ====================

    pub fn teams(&self) -> Vec<Team> {
        teams::all_teams()
    }

    pub fn teams_by_conference(&self) -> BTreeMap<Conference, Vec<Team>> {
        teams::by_conference()
    }

    pub fn standings(&self, season: &Season) -> Result<BTreeMap<Conference, Vec<StandingRow>>> {
        Ok(rankings(&self.source.standings(season)?))
    }

    pub fn team_results(&self, team: TeamId, season: &Season) -> Result<TeamResults> {
        let info = teams::find_by_id(team).ok_or_else(|| NbaError::NotFound(format!("{}", team)))?;
        let summary = self.summary(EntityId::Team(team), season)?;
        let games = self.games(EntityId::Team(team), season)?;

        Ok(TeamResults {
            team: info,
            season: season.clone(),
            wins: summary.wins,
            losses: summary.losses,
            win_pct: summary.win_pct(),
            streaks: streaks(&win_loss_series(&games)),
        })
    }

    // ==================== Aggregation ====================

    pub fn summary(&self, entity: EntityId, season: &Season) -> Result<SeasonSummary> {
        let key = CacheKey::new(entity, season.clone(), CacheKind::Summary);
        let value = self.cache.get_or_try_insert_with(key, || {
            let games = self.games(entity, season)?;
            Ok(CachedValue::Summary(SeasonSummary::from_games(&games)))
        })?;
        match value {
            CachedValue::Summary(summary) => Ok(summary),
            _ => Err(cache_mismatch()),
        }
    }

    pub fn describe_stat(&self, entity: EntityId, season: &Season, stat: GameStat) -> Result<StatisticBundle> {
        let key = CacheKey::new(entity, season.clone(), CacheKind::Describe(stat.name().to_string()));
        let value = self.cache.get_or_try_insert_with(key, || {
            let games = self.games(entity, season)?;
            Ok(CachedValue::Bundle(describe(&samples(&games, stat))))
        })?;
        match value {
            CachedValue::Bundle(bundle) => Ok(bundle),
            _ => Err(cache_mismatch()),
        }
    }

    /// Statistic bundles for every numeric attribute
    pub fn describe_all(&self, entity: EntityId, season: &Season) -> Result<BTreeMap<String, StatisticBundle>> {
        GameStat::ALL
            .iter()
            .map(|&stat| Ok((stat.name().to_string(), self.describe_stat(entity, season, stat)?)))
            .collect()
    }

    pub fn home_away(&self, entity: EntityId, season: &Season) -> Result<HomeAwaySplit> {
        Ok(split_home_away(&self.games(entity, season)?))
    }

    pub fn against_opponent(&self, entity: EntityId, season: &Season, opponent: &str) -> Result<OpponentReport> {
        let games = filter_by_opponent(&self.games(entity, season)?, opponent)?;
        Ok(OpponentReport {
            opponent: opponent.trim().to_uppercase(),
            summary: SeasonSummary::from_games(&games).report(),
            points: describe(&samples(&games, GameStat::Points)),
            games,
        })
    }

    pub fn win_loss(&self, entity: EntityId, season: &Season) -> Result<WinLossReport> {
        let games = self.games(entity, season)?;
        let series = win_loss_series(&games);
        Ok(WinLossReport {
            streaks: streaks(&series),
            running_win_pct: running_win_pct(&games),
            series,
        })
    }

    /// Chart series of one attribute, smoothed when a window is given
    pub fn chart(&self, entity: EntityId, season: &Season, stat: GameStat, window: Option<usize>) -> Result<Vec<SeriesPoint>> {
        let games = self.games(entity, season)?;
        match window {
            Some(0) => Err(NbaError::InvalidArgument("window must be positive".to_string())),
            Some(w) => Ok(rolling_series(&games, stat, w)),
            None => Ok(stat_series(&games, stat)),
        }
    }

    /// Pearson correlation between two attributes over the same games
    pub fn correlation(&self, entity: EntityId, season: &Season, a: GameStat, b: GameStat) -> Result<Option<f64>> {
        let games = self.games(entity, season)?;
        let pairs: Vec<(f64, f64)> = games
            .iter()
            .filter_map(|g| Some((a.value(g)?, b.value(g)?)))
            .collect();
        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        Ok(correlation(&xs, &ys))
    }

    // ==================== Forecasts ====================

    /// Next-season scoring forecast from the player's career
    pub fn season_forecast(&self, player: PlayerId) -> Result<ForecastResult> {
        let career = self.source.player_career(player)?;
        let latest = career
            .last()
            .map(|r| r.season.clone())
            .ok_or_else(|| NbaError::NotFound(format!("career of {}", player)))?;

        let key = CacheKey::new(EntityId::Player(player), latest, CacheKind::SeasonForecast);
        let value = self.cache.get_or_try_insert_with(key, || {
            forecast_season(&career, &self.config.forecast).map(CachedValue::Forecast)
        })?;
        match value {
            CachedValue::Forecast(result) => Ok(result),
            _ => Err(cache_mismatch()),
        }
    }

    /// Next-game points/rebounds/assists from one season's game log
    pub fn linear_forecast(&self, player: PlayerId, season: &Season) -> Result<LinearForecast> {
        let entity = EntityId::Player(player);
        let key = CacheKey::new(entity, season.clone(), CacheKind::LinearForecast);
        let value = self.cache.get_or_try_insert_with(key, || {
            let games = self.games(entity, season)?;
            forecast_linear(&games, &self.config.linear).map(CachedValue::Linear)
        })?;
        match value {
            CachedValue::Linear(result) => Ok(result),
            _ => Err(cache_mismatch()),
        }
    }

    // ==================== Bulk ====================

    pub fn roster_game_logs(&self, team: TeamId, season: &Season) -> Result<BTreeMap<PlayerId, Vec<GameRecord>>> {
        bulk::roster_game_logs(self.source.as_ref(), team, season, self.config.bulk.workers)
    }

    /// Season summary per rostered player, skipping players without games
    pub fn roster_summaries(&self, team: TeamId, season: &Season) -> Result<BTreeMap<PlayerId, SummaryReport>> {
        Ok(self
            .roster_game_logs(team, season)?
            .into_iter()
            .map(|(player, games)| (player, SeasonSummary::from_games(&games).report()))
            .collect())
    }
}

fn cache_mismatch() -> NbaError {
    NbaError::Parse("Cached value has an unexpected kind".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Database, RosterEntry};
    use crate::SeasonRecord;
    use chrono::NaiveDate;

    const PELICANS: TeamId = TeamId(1610612740);

    fn season() -> Season {
        Season::parse("2023-24").unwrap()
    }

    fn team_games() -> Vec<GameRecord> {
        let rows = [
            (1, "NOP vs. MEM", true, 110),
            (3, "NOP @ LAL", false, 98),
            (5, "NOP @ MEM", true, 121),
            (7, "NOP vs. BOS", true, 102),
            (9, "NOP vs. LAL", false, 117),
        ];
        rows.iter()
            .map(|&(day, matchup, win, points)| {
                let mut g = GameRecord::new(
                    NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                    matchup,
                    win,
                    points,
                );
                g.rebounds = Some(40 + day);
                g
            })
            .collect()
    }

    fn service() -> StatsService {
        let db = Database::in_memory().unwrap();
        db.replace_games(EntityId::Team(PELICANS), &season(), &team_games())
            .unwrap();
        StatsService::new(Box::new(db), Config::default())
    }

    #[test]
    fn test_summary_is_cached() {
        let service = service();
        let entity = EntityId::Team(PELICANS);
        let first = service.summary(entity, &season()).unwrap();
        assert_eq!(service.cache().len(), 1);
        let second = service.summary(entity, &season()).unwrap();
        assert_eq!(first, second);
        assert_eq!(service.cache().len(), 1);
        assert_eq!(first.wins, 3);
    }

    #[test]
    fn test_team_results() {
        let results = service().team_results(PELICANS, &season()).unwrap();
        assert_eq!(results.team.abbreviation, "NOP");
        assert_eq!((results.wins, results.losses), (3, 2));
        assert_eq!(results.streaks.longest_win, 2);
        assert_eq!(results.streaks.current, -1);
    }

    #[test]
    fn test_describe_and_split() {
        let service = service();
        let entity = EntityId::Team(PELICANS);
        let points = service.describe_stat(entity, &season(), GameStat::Points).unwrap();
        assert_eq!(points.count, 5);
        assert_eq!(points.mean, Some(109.6));

        let all = service.describe_all(entity, &season()).unwrap();
        assert_eq!(all.len(), GameStat::ALL.len());
        // Minutes were never recorded
        assert_eq!(all["minutes"].mean, None);

        let split = service.home_away(entity, &season()).unwrap();
        assert_eq!(split.home_count + split.away_count, 5);
        assert_eq!(split.home_count, 3);
    }

    #[test]
    fn test_opponent_filter() {
        let service = service();
        let entity = EntityId::Team(PELICANS);
        let report = service.against_opponent(entity, &season(), "lal").unwrap();
        assert_eq!(report.opponent, "LAL");
        assert_eq!(report.games.len(), 2);
        assert_eq!(report.summary.wins, 0);
        assert!(matches!(
            service.against_opponent(entity, &season(), "GSW"),
            Err(NbaError::NotFound(_))
        ));
        assert!(matches!(
            service.against_opponent(entity, &season(), ""),
            Err(NbaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_charts_and_correlation() {
        let service = service();
        let entity = EntityId::Team(PELICANS);
        let raw = service.chart(entity, &season(), GameStat::Points, None).unwrap();
        assert_eq!(raw.len(), 5);
        let smooth = service.chart(entity, &season(), GameStat::Points, Some(2)).unwrap();
        assert_eq!(smooth.len(), 4);
        assert!(service.chart(entity, &season(), GameStat::Points, Some(0)).is_err());

        let r = service
            .correlation(entity, &season(), GameStat::Rebounds, GameStat::Rebounds)
            .unwrap();
        assert!((r.unwrap() - 1.0).abs() < 1e-12);

        let report = service.win_loss(entity, &season()).unwrap();
        assert_eq!(report.series.len(), 5);
        assert_eq!(report.running_win_pct[0].value, 1.0);
    }

    #[test]
    fn test_unknown_entity_is_not_found() {
        let service = service();
        let err = service
            .summary(EntityId::Player(PlayerId(1)), &season())
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(service.cache().is_empty());
    }

    #[test]
    fn test_season_forecast_through_service() {
        let db = Database::in_memory().unwrap();
        let ppg = [10.0, 12.0, 11.0, 13.0, 12.0, 14.0];
        let career: Vec<SeasonRecord> = ppg
            .iter()
            .enumerate()
            .map(|(i, rate)| {
                let mut r = SeasonRecord::new(Season::from_start_year(2017 + i as i32), 70, rate * 70.0);
                r.fg_pct = Some(0.46);
                r.ft_pct = Some(0.81);
                r.rebounds = Some(350.0);
                r.assists = Some(210.0);
                r
            })
            .collect();
        db.replace_career(PlayerId(2544), &career).unwrap();

        let mut config = Config::default();
        config.forecast.n_trees = 10;
        config.forecast.boosting_rounds = 20;
        let service = StatsService::new(Box::new(db), config);

        let a = service.season_forecast(PlayerId(2544)).unwrap();
        let b = service.season_forecast(PlayerId(2544)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.season.as_str(), "2023-24");
        assert_eq!(service.cache().len(), 1);
    }

    #[test]
    fn test_roster_summaries() {
        let db = Database::in_memory().unwrap();
        let roster: Vec<RosterEntry> = [11, 12]
            .iter()
            .map(|&id| RosterEntry {
                player_id: PlayerId(id),
                name: format!("Player {}", id),
                number: None,
                position: None,
                age: None,
            })
            .collect();
        db.replace_roster(PELICANS, &season(), &roster).unwrap();
        db.replace_games(EntityId::Player(PlayerId(11)), &season(), &team_games())
            .unwrap();

        let service = StatsService::new(Box::new(db), Config::default());
        let summaries = service.roster_summaries(PELICANS, &season()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[&PlayerId(11)].games_played, 5);
    }
}
