//! HTTP client for the stats provider

use super::result_set::{parse_career, parse_game_log, parse_roster, parse_standings};
use super::{ProviderResponse, RetryPolicy, RosterEntry, StatsSource};
use crate::data::standings::StandingRow;
use crate::{ApiConfig, GameRecord, NbaError, PlayerId, Result, Season, SeasonRecord, TeamId};

const SEASON_TYPE: &str = "Regular Season";

/// Blocking client for the provider's JSON endpoints
pub struct StatsApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl StatsApiClient {
    pub fn new(config: &ApiConfig, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(StatsApiClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// GET an endpoint through the retry policy
    fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<ProviderResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("Fetching {} {:?}", url, params);

        self.retry.run(endpoint, || {
            let response = self
                .client
                .get(&url)
                .query(params)
                .header("Referer", "https://www.nba.com/")
                .header("Accept", "application/json")
                .send()?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(NbaError::NotFound(format!("{} {:?}", endpoint, params)));
            }
            let response = response.error_for_status()?;
            Ok(response.json::<ProviderResponse>()?)
        })
    }
}

type Query = Vec<(&'static str, String)>;

/// Game log query for either `PlayerID` or `TeamID`
fn game_log_query(id_param: &'static str, id: i64, season: &Season) -> Query {
    vec![
        (id_param, id.to_string()),
        ("Season", season.as_str().to_string()),
        ("SeasonType", SEASON_TYPE.to_string()),
    ]
}

fn career_query(player: PlayerId) -> Query {
    vec![
        ("PlayerID", player.0.to_string()),
        ("PerMode", "Totals".to_string()),
    ]
}

fn standings_query(season: &Season) -> Query {
    vec![
        ("LeagueID", "00".to_string()),
        ("Season", season.as_str().to_string()),
        ("SeasonType", SEASON_TYPE.to_string()),
    ]
}

fn roster_query(team: TeamId, season: &Season) -> Query {
    vec![
        ("TeamID", team.0.to_string()),
        ("Season", season.as_str().to_string()),
    ]
}

impl StatsSource for StatsApiClient {
    fn player_game_log(&self, player: PlayerId, season: &Season) -> Result<Vec<GameRecord>> {
        let response = self.fetch("playergamelog", &game_log_query("PlayerID", player.0, season))?;
        let games = parse_game_log(response.result_set("PlayerGameLog")?)?;
        log::info!("Fetched {} games for player {} in {}", games.len(), player, season);
        Ok(games)
    }

    fn team_game_log(&self, team: TeamId, season: &Season) -> Result<Vec<GameRecord>> {
        let response = self.fetch("teamgamelog", &game_log_query("TeamID", team.0, season))?;
        let games = parse_game_log(response.result_set("TeamGameLog")?)?;
        log::info!("Fetched {} games for team {} in {}", games.len(), team, season);
        Ok(games)
    }

    fn player_career(&self, player: PlayerId) -> Result<Vec<SeasonRecord>> {
        let response = self.fetch("playercareerstats", &career_query(player))?;
        parse_career(response.result_set("SeasonTotalsRegularSeason")?)
    }

    fn standings(&self, season: &Season) -> Result<Vec<StandingRow>> {
        let response = self.fetch("leaguestandings", &standings_query(season))?;
        parse_standings(response.result_set("Standings")?)
    }

    fn team_roster(&self, team: TeamId, season: &Season) -> Result<Vec<RosterEntry>> {
        let response = self.fetch("commonteamroster", &roster_query(team, season))?;
        parse_roster(response.result_set("CommonTeamRoster")?)
    }
}
