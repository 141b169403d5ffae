//! Bounded fan-out over many entities

use rayon::prelude::*;
use std::collections::BTreeMap;

use super::source::StatsSource;
use crate::{GameRecord, NbaError, PlayerId, Result, Season, TeamId};

/// Largest worker pool the fan-out will build
pub const MAX_WORKERS: usize = 16;

/// Run `task` for every id on a pool of `workers` threads
///
/// Failures are logged and left out of the result. Only an input that
/// yields nothing at all is an error.
pub fn fan_out<K, V, F>(ids: &[K], workers: usize, what: &str, task: F) -> Result<BTreeMap<K, V>>
where
    K: Ord + Copy + Send + Sync + std::fmt::Display,
    V: Send,
    F: Fn(K) -> Result<V> + Send + Sync,
{
    if ids.is_empty() {
        return Err(NbaError::NotFound(format!("no {} to fetch", what)));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.clamp(1, MAX_WORKERS))
        .build()
        .map_err(|e| NbaError::Config(format!("Failed to build worker pool: {}", e)))?;

    let outcomes: Vec<(K, Result<V>)> =
        pool.install(|| ids.par_iter().map(|&id| (id, task(id))).collect());

    let total = outcomes.len();
    let mut joined = BTreeMap::new();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                joined.insert(id, value);
            }
            Err(e) => log::warn!("Skipping {} for {}: {}", what, id, e),
        }
    }

    if joined.is_empty() {
        return Err(NbaError::NotFound(format!("{}: all {} fetches failed", what, total)));
    }
    log::info!("Fetched {} for {}/{} entities", what, joined.len(), total);
    Ok(joined)
}

/// Game logs for every player on a team's roster
pub fn roster_game_logs(
    source: &dyn StatsSource,
    team: TeamId,
    season: &Season,
    workers: usize,
) -> Result<BTreeMap<PlayerId, Vec<GameRecord>>> {
    let roster = source.team_roster(team, season)?;
    let ids: Vec<PlayerId> = roster.iter().map(|p| p.player_id).collect();
    fan_out(&ids, workers, "game logs", |player| {
        source.player_game_log(player, season)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::RosterEntry;
    use crate::data::Database;
    use crate::EntityId;
    use chrono::NaiveDate;

    fn entry(id: i64) -> RosterEntry {
        RosterEntry {
            player_id: PlayerId(id),
            name: format!("Player {}", id),
            number: None,
            position: None,
            age: None,
        }
    }

    #[test]
    fn test_failures_are_omitted() {
        let ids = [1i64, 2, 3, 4, 5];
        let result = fan_out(&ids, 3, "squares", |id| {
            if id % 2 == 0 {
                Err(NbaError::UpstreamTimeout {
                    endpoint: "test".to_string(),
                    attempts: 3,
                })
            } else {
                Ok(id * id)
            }
        })
        .unwrap();
        assert_eq!(result.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(result[&5], 25);
    }

    #[test]
    fn test_total_failure_is_not_found() {
        let result: Result<BTreeMap<i64, ()>> = fan_out(&[1, 2], 2, "nothing", |_| {
            Err(NbaError::Parse("bad row".to_string()))
        });
        assert!(matches!(result, Err(NbaError::NotFound(_))));
    }

    #[test]
    fn test_roster_game_logs_from_mirror() {
        let db = Database::in_memory().unwrap();
        let season = Season::parse("2023-24").unwrap();
        let team = TeamId(1610612740);
        db.replace_roster(team, &season, &[entry(1), entry(2), entry(3)])
            .unwrap();

        let game = GameRecord::new(
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            "NOP vs. SAS",
            true,
            24,
        );
        db.replace_games(EntityId::Player(PlayerId(1)), &season, &[game.clone()])
            .unwrap();
        db.replace_games(EntityId::Player(PlayerId(3)), &season, &[game])
            .unwrap();

        let logs = roster_game_logs(&db, team, &season, 4).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.contains_key(&PlayerId(1)));
        assert!(!logs.contains_key(&PlayerId(2)));
    }
}
