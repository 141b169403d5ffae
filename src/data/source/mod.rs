//! Upstream statistics sources
//!
//! The provider is consumed through [`StatsSource`]; the HTTP client and the
//! local SQLite mirror both implement it.

pub mod result_set;
pub mod stats_api;

pub use result_set::{ProviderResponse, ResultSet};
pub use stats_api::StatsApiClient;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::standings::StandingRow;
use crate::{
    EntityId, GameRecord, NbaError, PlayerId, Result, RetryConfig, Season, SeasonRecord, TeamId,
};

/// One player on a team's roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub number: Option<String>,
    pub position: Option<String>,
    pub age: Option<f64>,
}

/// Tabular per-game and per-season records for one entity at a time
pub trait StatsSource: Send + Sync {
    /// Games in provider order (most recent first for the live API)
    fn player_game_log(&self, player: PlayerId, season: &Season) -> Result<Vec<GameRecord>>;

    fn team_game_log(&self, team: TeamId, season: &Season) -> Result<Vec<GameRecord>>;

    /// Regular-season totals, one row per season, oldest first
    fn player_career(&self, player: PlayerId) -> Result<Vec<SeasonRecord>>;

    fn standings(&self, season: &Season) -> Result<Vec<StandingRow>>;

    fn team_roster(&self, team: TeamId, season: &Season) -> Result<Vec<RosterEntry>>;

    fn game_log(&self, entity: EntityId, season: &Season) -> Result<Vec<GameRecord>> {
        match entity {
            EntityId::Team(team) => self.team_game_log(team, season),
            EntityId::Player(player) => self.player_game_log(player, season),
        }
    }
}

/// Bounded retry with exponential backoff around upstream calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_factor: config.backoff_factor.max(1),
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            backoff_factor: 1,
        }
    }

    /// Wait before retry number `attempt` (0-based): base * factor^attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * self.backoff_factor.saturating_pow(attempt)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// Only transport failures are retried. Exhausting the budget on a
    /// timeout yields [`NbaError::UpstreamTimeout`].
    pub fn run<T, F>(&self, endpoint: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            let err = match operation() {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };
            attempt += 1;

            if !is_retryable(&err) {
                return Err(err);
            }
            log::warn!(
                "{}: attempt {}/{} failed: {}",
                endpoint,
                attempt,
                self.max_attempts,
                err
            );
            if attempt >= self.max_attempts {
                return Err(if is_timeout(&err) {
                    NbaError::UpstreamTimeout {
                        endpoint: endpoint.to_string(),
                        attempts: attempt,
                    }
                } else {
                    err
                });
            }
            std::thread::sleep(self.delay_for(attempt - 1));
        }
    }
}

fn is_retryable(err: &NbaError) -> bool {
    match err {
        NbaError::Http(e) => !e.is_decode() && e.status().map_or(true, |s| s.is_server_error()),
        NbaError::UpstreamTimeout { .. } => true,
        _ => false,
    }
}

fn is_timeout(err: &NbaError) -> bool {
    match err {
        NbaError::Http(e) => e.is_timeout(),
        NbaError::UpstreamTimeout { .. } => true,
        _ => false,
    }
}
