//! Parsing of the provider's tabular `resultSets` payloads

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::RosterEntry;
use crate::data::standings::StandingRow;
use crate::{
    opponent_from_matchup, Conference, GameRecord, Location, NbaError, PlayerId, Result, Season,
    SeasonRecord, TeamId,
};

/// Top-level provider response
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResponse {
    #[serde(rename = "resultSets")]
    pub result_sets: Vec<ResultSet>,
}

impl ProviderResponse {
    /// Named result set
    pub fn result_set(&self, name: &str) -> Result<&ResultSet> {
        self.result_sets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let found: Vec<&str> = self.result_sets.iter().map(|s| s.name.as_str()).collect();
                NbaError::NotFound(format!("result set {} (response has {:?})", name, found))
            })
    }
}

/// Column headers plus rows of loosely-typed values
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    pub name: String,
    pub headers: Vec<String>,
    #[serde(rename = "rowSet")]
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Column index by header, ignoring case
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(header))
    }

    pub fn require(&self, header: &str) -> Result<usize> {
        self.column(header)
            .ok_or_else(|| NbaError::MissingRequiredColumn {
                column: header.to_string(),
                table: self.name.clone(),
            })
    }
}

fn cell<'a>(row: &'a [Value], col: Option<usize>) -> Option<&'a Value> {
    col.and_then(|c| row.get(c)).filter(|v| !v.is_null())
}

fn number(row: &[Value], col: Option<usize>) -> Option<f64> {
    let value: Option<f64> = match cell(row, col)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn count(row: &[Value], col: Option<usize>) -> Option<u32> {
    number(row, col).map(|v| v.max(0.0).round() as u32)
}

fn text(row: &[Value], col: Option<usize>) -> Option<String> {
    match cell(row, col)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Provider dates come as `OCT 24, 2023` or ISO `2023-10-24[T00:00:00]`
pub fn parse_game_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let iso = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(raw, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(iso, "%Y-%m-%d"))
        .map_err(|_| NbaError::Parse(format!("Unrecognised game date '{}'", raw)))
}

/// Per-game rows from a player or team game log
pub fn parse_game_log(set: &ResultSet) -> Result<Vec<GameRecord>> {
    let date_col = set.require("GAME_DATE")?;
    let matchup_col = set.require("MATCHUP")?;
    let wl_col = set.require("WL")?;
    let pts_col = set.require("PTS")?;

    let game_id = set.column("Game_ID");
    let min = set.column("MIN");
    let fgm = set.column("FGM");
    let fga = set.column("FGA");
    let fg3m = set.column("FG3M");
    let fg3a = set.column("FG3A");
    let ftm = set.column("FTM");
    let fta = set.column("FTA");
    let reb = set.column("REB");
    let ast = set.column("AST");
    let stl = set.column("STL");
    let blk = set.column("BLK");
    let tov = set.column("TOV");
    let plus_minus = set.column("PLUS_MINUS");

    let mut games = Vec::with_capacity(set.rows.len());
    for row in &set.rows {
        let raw_date = text(row, Some(date_col))
            .ok_or_else(|| NbaError::Parse("Game row without a date".to_string()))?;
        let matchup = text(row, Some(matchup_col)).unwrap_or_default();

        games.push(GameRecord {
            game_id: text(row, game_id),
            date: parse_game_date(&raw_date)?,
            opponent: opponent_from_matchup(&matchup),
            location: Location::from_matchup(&matchup),
            matchup,
            win: text(row, Some(wl_col)).is_some_and(|wl| wl.eq_ignore_ascii_case("W")),
            points: count(row, Some(pts_col)).unwrap_or(0),
            rebounds: count(row, reb),
            assists: count(row, ast),
            steals: count(row, stl),
            blocks: count(row, blk),
            minutes: number(row, min),
            field_goals_made: count(row, fgm),
            field_goals_attempted: count(row, fga),
            threes_made: count(row, fg3m),
            threes_attempted: count(row, fg3a),
            free_throws_made: count(row, ftm),
            free_throws_attempted: count(row, fta),
            turnovers: count(row, tov),
            plus_minus: number(row, plus_minus),
        });
    }
    Ok(games)
}

/// Regular-season totals, one row per season
///
/// A traded player has one row per team plus a `TOT` row; the `TOT` row
/// wins.
pub fn parse_career(set: &ResultSet) -> Result<Vec<SeasonRecord>> {
    let season_col = set.require("SEASON_ID")?;
    let gp_col = set.require("GP")?;
    let pts_col = set.require("PTS")?;

    let team = set.column("TEAM_ABBREVIATION");
    let age = set.column("PLAYER_AGE");
    let min = set.column("MIN");
    let reb = set.column("REB");
    let ast = set.column("AST");
    let fg_pct = set.column("FG_PCT");
    let fg3_pct = set.column("FG3_PCT");
    let ft_pct = set.column("FT_PCT");

    let mut by_season: BTreeMap<Season, SeasonRecord> = BTreeMap::new();
    for row in &set.rows {
        let label = text(row, Some(season_col))
            .ok_or_else(|| NbaError::Parse("Career row without a season".to_string()))?;
        let season = Season::parse(&label)?;

        let record = SeasonRecord {
            season: season.clone(),
            team: text(row, team),
            age: number(row, age),
            games_played: count(row, Some(gp_col)).unwrap_or(0),
            minutes: number(row, min),
            points: number(row, Some(pts_col)).unwrap_or(0.0),
            rebounds: number(row, reb),
            assists: number(row, ast),
            fg_pct: number(row, fg_pct),
            fg3_pct: number(row, fg3_pct),
            ft_pct: number(row, ft_pct),
        };

        let is_total = record.team.as_deref() == Some("TOT");
        match by_season.get(&season) {
            Some(existing) if existing.team.as_deref() == Some("TOT") || !is_total => {}
            _ => {
                by_season.insert(season, record);
            }
        }
    }
    Ok(by_season.into_values().collect())
}

pub fn parse_standings(set: &ResultSet) -> Result<Vec<StandingRow>> {
    let id_col = set.require("TeamID")?;
    let conf_col = set.require("Conference")?;
    let wins_col = set.require("WINS")?;
    let losses_col = set.require("LOSSES")?;

    let city = set.column("TeamCity");
    let name = set.column("TeamName");
    let pct = set.column("WinPCT");
    let rank = set.column("PlayoffRank");

    let mut rows = Vec::with_capacity(set.rows.len());
    for row in &set.rows {
        let id = number(row, Some(id_col))
            .ok_or_else(|| NbaError::Parse("Standings row without a team id".to_string()))?;
        let conference_code = text(row, Some(conf_col)).unwrap_or_default();
        let conference = Conference::from_code(&conference_code).ok_or_else(|| {
            NbaError::Parse(format!("Unknown conference '{}'", conference_code))
        })?;
        let team_name = match (text(row, city), text(row, name)) {
            (Some(c), Some(n)) => format!("{} {}", c, n),
            (None, Some(n)) => n,
            (Some(c), None) => c,
            (None, None) => format!("Team {}", id as i64),
        };

        rows.push(StandingRow {
            team_id: TeamId(id as i64),
            team_name,
            conference,
            wins: count(row, Some(wins_col)).unwrap_or(0),
            losses: count(row, Some(losses_col)).unwrap_or(0),
            win_pct: number(row, pct),
            playoff_rank: number(row, rank).map(|r| r as u32),
        });
    }
    Ok(rows)
}

pub fn parse_roster(set: &ResultSet) -> Result<Vec<RosterEntry>> {
    let id_col = set.require("PLAYER_ID")?;
    let name_col = set.require("PLAYER")?;
    let num = set.column("NUM");
    let position = set.column("POSITION");
    let age = set.column("AGE");

    set.rows
        .iter()
        .map(|row| {
            let id = number(row, Some(id_col))
                .ok_or_else(|| NbaError::Parse("Roster row without a player id".to_string()))?;
            Ok(RosterEntry {
                player_id: PlayerId(id as i64),
                name: text(row, Some(name_col)).unwrap_or_default(),
                number: text(row, num).filter(|n| !n.is_empty()),
                position: text(row, position).filter(|p| !p.is_empty()),
                age: number(row, age),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn game_log_set(headers: &[&str], rows: Vec<Value>) -> ResultSet {
        ResultSet {
            name: "PlayerGameLog".to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.as_array().cloned().unwrap_or_default())
                .collect(),
        }
    }

    #[test]
    fn test_deserialise_provider_payload() {
        let body = json!({
            "resource": "playergamelog",
            "resultSets": [{
                "name": "PlayerGameLog",
                "headers": ["Game_ID", "GAME_DATE", "MATCHUP", "WL", "MIN", "PTS", "REB", "AST", "PLUS_MINUS"],
                "rowSet": [
                    ["0022300061", "OCT 24, 2023", "LAL @ DEN", "L", 29, 21, 8, 5, -12],
                    ["0022300075", "OCT 26, 2023", "LAL vs. PHX", "W", 35, 21, 11, 8, null]
                ]
            }]
        });
        let response: ProviderResponse = serde_json::from_value(body).unwrap();
        let games = parse_game_log(response.result_set("PlayerGameLog").unwrap()).unwrap();

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].date, NaiveDate::from_ymd_opt(2023, 10, 24).unwrap());
        assert_eq!(games[0].location, Location::Away);
        assert_eq!(games[0].opponent, "DEN");
        assert!(!games[0].win);
        assert_eq!(games[0].plus_minus, Some(-12.0));
        assert_eq!(games[1].location, Location::Home);
        assert!(games[1].win);
        assert_eq!(games[1].plus_minus, None);
        assert_eq!(games[1].game_id.as_deref(), Some("0022300075"));
        assert_eq!(games[1].rebounds, Some(11));
        assert_eq!(games[1].assists, Some(8));
        // Columns the payload does not carry stay absent
        assert_eq!(games[1].field_goals_attempted, None);
        assert_eq!(games[1].steals, None);
        assert_eq!(games[1].turnovers, None);
    }

    #[test]
    fn test_minimal_game_log_leaves_box_score_empty() {
        let set = game_log_set(
            &["GAME_DATE", "MATCHUP", "WL", "PTS"],
            vec![
                json!(["NOV 01, 2023", "NOP vs. MEM", "W", 112]),
                json!(["NOV 03, 2023", "NOP @ SAS", "L", 98]),
            ],
        );
        let games = parse_game_log(&set).unwrap();
        assert_eq!(games[0].points, 112);
        for game in &games {
            assert_eq!(game.rebounds, None);
            assert_eq!(game.assists, None);
            assert_eq!(game.field_goals_made, None);
            assert_eq!(game.free_throws_attempted, None);
            assert_eq!(game.blocks, None);
        }
    }

    #[test]
    fn test_steals_and_blocks() {
        let set = game_log_set(
            &["GAME_DATE", "MATCHUP", "WL", "PTS", "STL", "BLK"],
            vec![json!(["2024-01-10", "BOS vs. MIA", "W", 118, 9, 6])],
        );
        let games = parse_game_log(&set).unwrap();
        assert_eq!(games[0].steals, Some(9));
        assert_eq!(games[0].blocks, Some(6));
    }

    #[test]
    fn test_result_set_by_name_only() {
        let body = json!({
            "resultSets": [{ "name": "OtherTable", "headers": ["PTS"], "rowSet": [] }]
        });
        let response: ProviderResponse = serde_json::from_value(body).unwrap();
        assert!(response.result_set("othertable").is_ok());
        assert!(matches!(
            response.result_set("PlayerGameLog"),
            Err(NbaError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let set = game_log_set(&["GAME_DATE", "MATCHUP", "WL"], vec![]);
        match parse_game_log(&set) {
            Err(NbaError::MissingRequiredColumn { column, table }) => {
                assert_eq!(column, "PTS");
                assert_eq!(table, "PlayerGameLog");
            }
            other => panic!("expected MissingRequiredColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 4, 14).unwrap();
        assert_eq!(parse_game_date("APR 14, 2024").unwrap(), expected);
        assert_eq!(parse_game_date("Apr 14, 2024").unwrap(), expected);
        assert_eq!(parse_game_date("2024-04-14T00:00:00").unwrap(), expected);
        assert!(parse_game_date("yesterday").is_err());
    }

    #[test]
    fn test_career_prefers_total_row() {
        let set = ResultSet {
            name: "SeasonTotalsRegularSeason".to_string(),
            headers: ["SEASON_ID", "TEAM_ABBREVIATION", "GP", "PTS", "FG_PCT"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows: vec![
                vec![json!("2019-20"), json!("LAL"), json!(60), json!(1500), json!(0.5)],
                vec![json!("2018-19"), json!("HOU"), json!(20), json!(300), json!(0.4)],
                vec![json!("2018-19"), json!("LAL"), json!(40), json!(800), json!(0.45)],
                vec![json!("2018-19"), json!("TOT"), json!(60), json!(1100), json!(0.43)],
            ],
        };
        let career = parse_career(&set).unwrap();
        assert_eq!(career.len(), 2);
        assert_eq!(career[0].season.as_str(), "2018-19");
        assert_eq!(career[0].games_played, 60);
        assert_eq!(career[0].points, 1100.0);
        assert_eq!(career[1].fg_pct, Some(0.5));
    }

    #[test]
    fn test_standings_and_roster() {
        let standings = ResultSet {
            name: "Standings".to_string(),
            headers: ["TeamID", "TeamCity", "TeamName", "Conference", "PlayoffRank", "WINS", "LOSSES", "WinPCT"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows: vec![vec![
                json!(1610612738),
                json!("Boston"),
                json!("Celtics"),
                json!("East"),
                json!(1),
                json!(64),
                json!(18),
                json!(0.78),
            ]],
        };
        let rows = parse_standings(&standings).unwrap();
        assert_eq!(rows[0].team_name, "Boston Celtics");
        assert_eq!(rows[0].conference, Conference::East);
        assert_eq!(rows[0].playoff_rank, Some(1));

        let roster = ResultSet {
            name: "CommonTeamRoster".to_string(),
            headers: ["PLAYER", "NUM", "POSITION", "AGE", "PLAYER_ID"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows: vec![vec![json!("Zion Williamson"), json!("1"), json!("F"), json!(23.0), json!(1629627)]],
        };
        let players = parse_roster(&roster).unwrap();
        assert_eq!(players[0].player_id, PlayerId(1629627));
        assert_eq!(players[0].number.as_deref(), Some("1"));
    }
}
