//! SQLite mirror of fetched provider data

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::source::{RosterEntry, StatsSource};
use super::standings::StandingRow;
use crate::{
    opponent_from_matchup, Conference, EntityId, GameRecord, Location, NbaError, PlayerId, Result,
    Season, SeasonRecord, TeamId,
};

/// Database connection and operations
///
/// The connection sits behind a mutex so one handle can serve the worker
/// pool used for bulk fetches.
pub struct Database {
    conn: Mutex<Connection>,
}

fn entity_key(entity: EntityId) -> (&'static str, i64) {
    match entity {
        EntityId::Team(id) => ("team", id.0),
        EntityId::Player(id) => ("player", id.0),
    }
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                entity_kind TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                season TEXT NOT NULL,
                seq INTEGER NOT NULL,
                game_id TEXT,
                date TEXT NOT NULL,
                matchup TEXT NOT NULL,
                win INTEGER NOT NULL,
                points INTEGER NOT NULL,
                rebounds INTEGER,
                assists INTEGER,
                steals INTEGER,
                blocks INTEGER,
                minutes REAL,
                fgm INTEGER,
                fga INTEGER,
                fg3m INTEGER,
                fg3a INTEGER,
                ftm INTEGER,
                fta INTEGER,
                turnovers INTEGER,
                plus_minus REAL,
                PRIMARY KEY (entity_kind, entity_id, season, seq)
            );

            CREATE TABLE IF NOT EXISTS career_seasons (
                player_id INTEGER NOT NULL,
                season TEXT NOT NULL,
                team TEXT,
                age REAL,
                games_played INTEGER NOT NULL,
                minutes REAL,
                points REAL NOT NULL,
                rebounds REAL,
                assists REAL,
                fg_pct REAL,
                fg3_pct REAL,
                ft_pct REAL,
                PRIMARY KEY (player_id, season)
            );

            CREATE TABLE IF NOT EXISTS standings (
                season TEXT NOT NULL,
                team_id INTEGER NOT NULL,
                team_name TEXT NOT NULL,
                conference TEXT NOT NULL,
                wins INTEGER NOT NULL,
                losses INTEGER NOT NULL,
                win_pct REAL,
                playoff_rank INTEGER,
                PRIMARY KEY (season, team_id)
            );

            CREATE TABLE IF NOT EXISTS rosters (
                team_id INTEGER NOT NULL,
                season TEXT NOT NULL,
                player_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                number TEXT,
                position TEXT,
                age REAL,
                PRIMARY KEY (team_id, season, player_id)
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Logs ====================

    /// Replace the stored game log for one entity and season
    pub fn replace_games(&self, entity: EntityId, season: &Season, games: &[GameRecord]) -> Result<usize> {
        let (kind, id) = entity_key(entity);
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM games WHERE entity_kind = ?1 AND entity_id = ?2 AND season = ?3",
            params![kind, id, season.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO games (entity_kind, entity_id, season, seq, game_id, date, matchup,
                                   win, points, rebounds, assists, steals, blocks, minutes,
                                   fgm, fga, fg3m, fg3a, ftm, fta, turnovers, plus_minus)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                        ?17, ?18, ?19, ?20, ?21, ?22)
                "#,
            )?;
            for (seq, g) in games.iter().enumerate() {
                stmt.execute(params![
                    kind,
                    id,
                    season.as_str(),
                    seq as i64,
                    g.game_id,
                    g.date.format("%Y-%m-%d").to_string(),
                    g.matchup,
                    g.win,
                    g.points,
                    g.rebounds,
                    g.assists,
                    g.steals,
                    g.blocks,
                    g.minutes,
                    g.field_goals_made,
                    g.field_goals_attempted,
                    g.threes_made,
                    g.threes_attempted,
                    g.free_throws_made,
                    g.free_throws_attempted,
                    g.turnovers,
                    g.plus_minus,
                ])?;
            }
        }
        tx.commit()?;
        Ok(games.len())
    }

    /// Stored game log in the order it was fetched
    pub fn get_games(&self, entity: EntityId, season: &Season) -> Result<Vec<GameRecord>> {
        let (kind, id) = entity_key(entity);
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT game_id, date, matchup, win, points, rebounds, assists, steals, blocks,
                    minutes, fgm, fga, fg3m, fg3a, ftm, fta, turnovers, plus_minus
             FROM games
             WHERE entity_kind = ?1 AND entity_id = ?2 AND season = ?3
             ORDER BY seq",
        )?;

        let games = stmt
            .query_map(params![kind, id, season.as_str()], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(games)
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let matchup: String = row.get(2)?;

        Ok(GameRecord {
            game_id: row.get(0)?,
            date,
            opponent: opponent_from_matchup(&matchup),
            location: Location::from_matchup(&matchup),
            matchup,
            win: row.get(3)?,
            points: row.get(4)?,
            rebounds: row.get(5)?,
            assists: row.get(6)?,
            steals: row.get(7)?,
            blocks: row.get(8)?,
            minutes: row.get(9)?,
            field_goals_made: row.get(10)?,
            field_goals_attempted: row.get(11)?,
            threes_made: row.get(12)?,
            threes_attempted: row.get(13)?,
            free_throws_made: row.get(14)?,
            free_throws_attempted: row.get(15)?,
            turnovers: row.get(16)?,
            plus_minus: row.get(17)?,
        })
    }

    // ==================== Career ====================

    pub fn replace_career(&self, player: PlayerId, records: &[SeasonRecord]) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM career_seasons WHERE player_id = ?1",
            params![player.0],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO career_seasons (player_id, season, team, age, games_played, minutes,
                                             points, rebounds, assists, fg_pct, fg3_pct, ft_pct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for r in records {
                stmt.execute(params![
                    player.0,
                    r.season.as_str(),
                    r.team,
                    r.age,
                    r.games_played,
                    r.minutes,
                    r.points,
                    r.rebounds,
                    r.assists,
                    r.fg_pct,
                    r.fg3_pct,
                    r.ft_pct,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Career rows, oldest season first
    pub fn get_career(&self, player: PlayerId) -> Result<Vec<SeasonRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT season, team, age, games_played, minutes, points, rebounds, assists,
                    fg_pct, fg3_pct, ft_pct
             FROM career_seasons WHERE player_id = ?1 ORDER BY season",
        )?;

        let records = stmt
            .query_map(params![player.0], |row| {
                let label: String = row.get(0)?;
                let season = Season::parse(&label).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(SeasonRecord {
                    season,
                    team: row.get(1)?,
                    age: row.get(2)?,
                    games_played: row.get(3)?,
                    minutes: row.get(4)?,
                    points: row.get(5)?,
                    rebounds: row.get(6)?,
                    assists: row.get(7)?,
                    fg_pct: row.get(8)?,
                    fg3_pct: row.get(9)?,
                    ft_pct: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // ==================== Standings and Rosters ====================

    pub fn replace_standings(&self, season: &Season, rows: &[StandingRow]) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM standings WHERE season = ?1",
            params![season.as_str()],
        )?;
        for r in rows {
            tx.execute(
                "INSERT INTO standings (season, team_id, team_name, conference, wins, losses,
                                        win_pct, playoff_rank)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    season.as_str(),
                    r.team_id.0,
                    r.team_name,
                    r.conference.to_string(),
                    r.wins,
                    r.losses,
                    r.win_pct,
                    r.playoff_rank,
                ],
            )?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn get_standings(&self, season: &Season) -> Result<Vec<StandingRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT team_id, team_name, conference, wins, losses, win_pct, playoff_rank
             FROM standings WHERE season = ?1 ORDER BY team_id",
        )?;
        let rows = stmt
            .query_map(params![season.as_str()], |row| {
                let code: String = row.get(2)?;
                Ok(StandingRow {
                    team_id: TeamId(row.get(0)?),
                    team_name: row.get(1)?,
                    conference: Conference::from_code(&code).unwrap_or(Conference::East),
                    wins: row.get(3)?,
                    losses: row.get(4)?,
                    win_pct: row.get(5)?,
                    playoff_rank: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn replace_roster(&self, team: TeamId, season: &Season, roster: &[RosterEntry]) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM rosters WHERE team_id = ?1 AND season = ?2",
            params![team.0, season.as_str()],
        )?;
        for p in roster {
            tx.execute(
                "INSERT OR REPLACE INTO rosters (team_id, season, player_id, name, number, position, age)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    team.0,
                    season.as_str(),
                    p.player_id.0,
                    p.name,
                    p.number,
                    p.position,
                    p.age,
                ],
            )?;
        }
        tx.commit()?;
        Ok(roster.len())
    }

    pub fn get_roster(&self, team: TeamId, season: &Season) -> Result<Vec<RosterEntry>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT player_id, name, number, position, age
             FROM rosters WHERE team_id = ?1 AND season = ?2 ORDER BY name",
        )?;
        let roster = stmt
            .query_map(params![team.0, season.as_str()], |row| {
                Ok(RosterEntry {
                    player_id: PlayerId(row.get(0)?),
                    name: row.get(1)?,
                    number: row.get(2)?,
                    position: row.get(3)?,
                    age: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(roster)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.lock();
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let game_count = count("SELECT COUNT(*) FROM games")?;
        let game_log_count = count(
            "SELECT COUNT(*) FROM (SELECT DISTINCT entity_kind, entity_id, season FROM games)",
        )?;
        let career_player_count = count("SELECT COUNT(DISTINCT player_id) FROM career_seasons")?;
        let standings_season_count = count("SELECT COUNT(DISTINCT season) FROM standings")?;
        let roster_player_count = count("SELECT COUNT(*) FROM rosters")?;

        let min_date: Option<String> = conn
            .query_row("SELECT MIN(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();
        let max_date: Option<String> = conn
            .query_row("SELECT MAX(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            game_count,
            game_log_count,
            career_player_count,
            standings_season_count,
            roster_player_count,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    pub game_count: usize,
    pub game_log_count: usize,
    pub career_player_count: usize,
    pub standings_season_count: usize,
    pub roster_player_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

fn non_empty<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> Result<Vec<T>> {
    if rows.is_empty() {
        Err(NbaError::NotFound(what()))
    } else {
        Ok(rows)
    }
}

/// The local mirror answers the same queries as the live provider
impl StatsSource for Database {
    fn player_game_log(&self, player: PlayerId, season: &Season) -> Result<Vec<GameRecord>> {
        non_empty(self.get_games(EntityId::Player(player), season)?, || {
            format!("games for {} in {}", player, season)
        })
    }

    fn team_game_log(&self, team: TeamId, season: &Season) -> Result<Vec<GameRecord>> {
        non_empty(self.get_games(EntityId::Team(team), season)?, || {
            format!("games for {} in {}", team, season)
        })
    }

    fn player_career(&self, player: PlayerId) -> Result<Vec<SeasonRecord>> {
        non_empty(self.get_career(player)?, || format!("career of {}", player))
    }

    fn standings(&self, season: &Season) -> Result<Vec<StandingRow>> {
        non_empty(self.get_standings(season)?, || format!("standings for {}", season))
    }

    fn team_roster(&self, team: TeamId, season: &Season) -> Result<Vec<RosterEntry>> {
        non_empty(self.get_roster(team, season)?, || {
            format!("roster of {} in {}", team, season)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season() -> Season {
        Season::parse("2023-24").unwrap()
    }

    fn sample_games() -> Vec<GameRecord> {
        let mut first = GameRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            "NOP vs. MEM",
            true,
            121,
        );
        first.plus_minus = Some(16.0);
        first.minutes = Some(240.0);
        first.turnovers = Some(11);
        first.rebounds = Some(47);
        first.blocks = Some(6);
        first.field_goals_made = Some(45);
        first.field_goals_attempted = Some(88);
        let second = GameRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            "NOP @ LAL",
            false,
            98,
        );
        vec![first, second]
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.game_count, 0);
        assert_eq!(stats.earliest_game, None);
    }

    #[test]
    fn test_games_round_trip_in_fetch_order() {
        let db = Database::in_memory().unwrap();
        let entity = EntityId::Team(TeamId(1610612740));
        db.replace_games(entity, &season(), &sample_games()).unwrap();

        let games = db.get_games(entity, &season()).unwrap();
        assert_eq!(games, sample_games());
        assert_eq!(games[0].blocks, Some(6));
        // Unreported columns come back absent, not zero
        assert_eq!(games[1].rebounds, None);
        assert_eq!(games[1].field_goals_attempted, None);

        // Re-syncing replaces rather than appends
        db.replace_games(entity, &season(), &sample_games()[..1]).unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.game_count, 1);
        assert_eq!(stats.game_log_count, 1);
    }

    #[test]
    fn test_missing_data_is_not_found() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.team_game_log(TeamId(1), &season()),
            Err(NbaError::NotFound(_))
        ));
        assert!(matches!(
            db.player_career(PlayerId(1)),
            Err(NbaError::NotFound(_))
        ));
    }

    #[test]
    fn test_career_and_standings() {
        let db = Database::in_memory().unwrap();
        let mut later = SeasonRecord::new(season(), 70, 1750.0);
        later.fg_pct = Some(0.51);
        let earlier = SeasonRecord::new(season().previous(), 60, 1200.0);
        db.replace_career(PlayerId(2544), &[later.clone(), earlier.clone()])
            .unwrap();
        assert_eq!(db.player_career(PlayerId(2544)).unwrap(), vec![earlier, later]);

        let row = StandingRow {
            team_id: TeamId(1610612738),
            team_name: "Boston Celtics".to_string(),
            conference: Conference::East,
            wins: 64,
            losses: 18,
            win_pct: Some(0.78),
            playoff_rank: Some(1),
        };
        db.replace_standings(&season(), &[row.clone()]).unwrap();
        assert_eq!(db.standings(&season()).unwrap(), vec![row]);
    }
}
