//! Static franchise table

use std::collections::BTreeMap;

use crate::{Conference, NbaError, Result, Team, TeamId};

use crate::Conference::{East, West};

const TEAMS: [(i64, &str, &str, Conference); 30] = [
    (1610612737, "ATL", "Atlanta Hawks", East),
    (1610612738, "BOS", "Boston Celtics", East),
    (1610612751, "BKN", "Brooklyn Nets", East),
    (1610612766, "CHA", "Charlotte Hornets", East),
    (1610612741, "CHI", "Chicago Bulls", East),
    (1610612739, "CLE", "Cleveland Cavaliers", East),
    (1610612742, "DAL", "Dallas Mavericks", West),
    (1610612743, "DEN", "Denver Nuggets", West),
    (1610612765, "DET", "Detroit Pistons", East),
    (1610612744, "GSW", "Golden State Warriors", West),
    (1610612745, "HOU", "Houston Rockets", West),
    (1610612754, "IND", "Indiana Pacers", East),
    (1610612746, "LAC", "LA Clippers", West),
    (1610612747, "LAL", "Los Angeles Lakers", West),
    (1610612763, "MEM", "Memphis Grizzlies", West),
    (1610612748, "MIA", "Miami Heat", East),
    (1610612749, "MIL", "Milwaukee Bucks", East),
    (1610612750, "MIN", "Minnesota Timberwolves", West),
    (1610612740, "NOP", "New Orleans Pelicans", West),
    (1610612752, "NYK", "New York Knicks", East),
    (1610612760, "OKC", "Oklahoma City Thunder", West),
    (1610612753, "ORL", "Orlando Magic", East),
    (1610612755, "PHI", "Philadelphia 76ers", East),
    (1610612756, "PHX", "Phoenix Suns", West),
    (1610612757, "POR", "Portland Trail Blazers", West),
    (1610612758, "SAC", "Sacramento Kings", West),
    (1610612759, "SAS", "San Antonio Spurs", West),
    (1610612761, "TOR", "Toronto Raptors", East),
    (1610612762, "UTA", "Utah Jazz", West),
    (1610612764, "WAS", "Washington Wizards", East),
];

fn to_team(entry: &(i64, &str, &str, Conference)) -> Team {
    Team {
        id: TeamId(entry.0),
        abbreviation: entry.1.to_string(),
        name: entry.2.to_string(),
        conference: entry.3,
    }
}

/// All 30 franchises, ordered by name
pub fn all_teams() -> Vec<Team> {
    let mut teams: Vec<Team> = TEAMS.iter().map(to_team).collect();
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    teams
}

pub fn find_by_id(id: TeamId) -> Option<Team> {
    TEAMS.iter().find(|t| t.0 == id.0).map(to_team)
}

pub fn find_by_abbreviation(abbreviation: &str) -> Option<Team> {
    TEAMS
        .iter()
        .find(|t| t.1.eq_ignore_ascii_case(abbreviation.trim()))
        .map(to_team)
}

/// Resolve a team from an id, abbreviation, full name or nickname
pub fn lookup(query: &str) -> Result<Team> {
    let query = query.trim();
    if query.is_empty() {
        return Err(NbaError::InvalidArgument("Empty team name".to_string()));
    }
    if let Ok(id) = query.parse::<i64>() {
        return find_by_id(TeamId(id)).ok_or_else(|| NbaError::NotFound(format!("team {}", id)));
    }
    if let Some(team) = find_by_abbreviation(query) {
        return Ok(team);
    }

    let lower = query.to_lowercase();
    TEAMS
        .iter()
        .find(|t| {
            let name = t.2.to_lowercase();
            name == lower || name.ends_with(&format!(" {}", lower))
        })
        .map(to_team)
        .ok_or_else(|| NbaError::NotFound(format!("team '{}'", query)))
}

/// Teams grouped by conference, each group ordered by name
pub fn by_conference() -> BTreeMap<Conference, Vec<Team>> {
    let mut groups: BTreeMap<Conference, Vec<Team>> = BTreeMap::new();
    for team in all_teams() {
        groups.entry(team.conference).or_default().push(team);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_variants() {
        assert_eq!(lookup("NOP").unwrap().name, "New Orleans Pelicans");
        assert_eq!(lookup("nop").unwrap().id, TeamId(1610612740));
        assert_eq!(lookup("Pelicans").unwrap().abbreviation, "NOP");
        assert_eq!(lookup("boston celtics").unwrap().abbreviation, "BOS");
        assert_eq!(lookup("1610612747").unwrap().abbreviation, "LAL");
        assert!(matches!(lookup("Sonics"), Err(NbaError::NotFound(_))));
        assert!(matches!(lookup(" "), Err(NbaError::InvalidArgument(_))));
    }

    #[test]
    fn test_conferences_are_balanced() {
        let groups = by_conference();
        assert_eq!(groups[&Conference::East].len(), 15);
        assert_eq!(groups[&Conference::West].len(), 15);
        assert_eq!(all_teams().len(), 30);
    }
}
