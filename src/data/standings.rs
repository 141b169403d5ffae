//! League standings and conference rankings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::ratio;
use crate::{Conference, TeamId};

/// One team's line in the standings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: TeamId,
    pub team_name: String,
    pub conference: Conference,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: Option<f64>,
    pub playoff_rank: Option<u32>,
}

impl StandingRow {
    /// Provider win% when present, otherwise wins over games played
    pub fn effective_win_pct(&self) -> Option<f64> {
        self.win_pct
            .or_else(|| ratio(self.wins as f64, (self.wins + self.losses) as f64))
    }
}

/// Standings split by conference, best first
///
/// Ordered by playoff rank when known, then by win% descending.
pub fn rankings(rows: &[StandingRow]) -> BTreeMap<Conference, Vec<StandingRow>> {
    let mut groups: BTreeMap<Conference, Vec<StandingRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.conference).or_default().push(row.clone());
    }

    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            let rank_a = a.playoff_rank.unwrap_or(u32::MAX);
            let rank_b = b.playoff_rank.unwrap_or(u32::MAX);
            rank_a.cmp(&rank_b).then_with(|| {
                let pct_a = a.effective_win_pct().unwrap_or(0.0);
                let pct_b = b.effective_win_pct().unwrap_or(0.0);
                pct_b.total_cmp(&pct_a)
            })
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, conference: Conference, wins: u32, losses: u32, rank: Option<u32>) -> StandingRow {
        StandingRow {
            team_id: TeamId(id),
            team_name: format!("Team {}", id),
            conference,
            wins,
            losses,
            win_pct: None,
            playoff_rank: rank,
        }
    }

    #[test]
    fn test_rankings_group_and_order() {
        let rows = vec![
            row(1, Conference::East, 30, 52, None),
            row(2, Conference::West, 57, 25, Some(1)),
            row(3, Conference::East, 64, 18, Some(1)),
            row(4, Conference::East, 50, 32, None),
            row(5, Conference::West, 40, 42, Some(9)),
        ];
        let groups = rankings(&rows);
        let east: Vec<i64> = groups[&Conference::East].iter().map(|r| r.team_id.0).collect();
        assert_eq!(east, vec![3, 4, 1]);
        let west: Vec<i64> = groups[&Conference::West].iter().map(|r| r.team_id.0).collect();
        assert_eq!(west, vec![2, 5]);
    }

    #[test]
    fn test_win_pct_fallback() {
        let r = row(1, Conference::East, 0, 0, None);
        assert_eq!(r.effective_win_pct(), None);
        let r = row(1, Conference::East, 41, 41, None);
        assert_eq!(r.effective_win_pct(), Some(0.5));
    }
}
