//! NBA statistics CLI
//!
//! Syncs provider data into a local mirror, prints descriptive statistics
//! and splits, and forecasts player scoring.

use clap::{Parser, Subcommand};
use nba::{Config, Result};

#[derive(Parser)]
#[command(name = "nba")]
#[command(about = "NBA team and player statistics with scoring forecasts", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Query the stats provider directly instead of the local mirror
    #[arg(long, global = true)]
    live: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// List teams grouped by conference
    Teams,
    /// Conference rankings for a season
    Standings {
        #[arg(long, default_value = "2023-24")]
        season: String,
    },
    /// Win/loss totals and streaks for a team
    Results {
        team: String,
        #[arg(long, default_value = "2023-24")]
        season: String,
    },
    /// Descriptive statistics for a team or player season
    Stats {
        #[command(subcommand)]
        target: StatsTarget,
    },
    /// A team's games against one opponent
    Opponent {
        team: String,
        opponent: String,
        #[arg(long, default_value = "2023-24")]
        season: String,
    },
    /// Forecast a player's scoring
    Predict {
        #[command(subcommand)]
        model: PredictCommands,
    },
    /// Export a season's games and statistics to CSV
    Export {
        #[command(subcommand)]
        target: StatsTarget,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Fetch from the stats provider into the local mirror
    Sync {
        /// Team name, abbreviation or id
        #[arg(long)]
        team: Option<String>,
        /// Player id (game log and career)
        #[arg(long)]
        player: Option<i64>,
        /// Also fetch game logs for the team's whole roster
        #[arg(long)]
        roster: bool,
        /// Also fetch league standings
        #[arg(long)]
        standings: bool,
        #[arg(long, default_value = "2023-24")]
        season: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand, Clone)]
enum StatsTarget {
    Team {
        team: String,
        #[arg(long, default_value = "2023-24")]
        season: String,
        #[arg(long, default_value = "summary")]
        view: View,
        /// Attribute for describe/chart views
        #[arg(long, default_value = "points")]
        stat: String,
        /// Rolling window for the chart view
        #[arg(long)]
        window: Option<usize>,
    },
    Player {
        id: i64,
        #[arg(long, default_value = "2023-24")]
        season: String,
        #[arg(long, default_value = "summary")]
        view: View,
        #[arg(long, default_value = "points")]
        stat: String,
        #[arg(long)]
        window: Option<usize>,
    },
}

#[derive(Subcommand)]
enum PredictCommands {
    /// Next-season points from the player's career totals
    Season { player: i64 },
    /// Next-game points/rebounds/assists from one season's game log
    Linear {
        player: i64,
        #[arg(long, default_value = "2023-24")]
        season: String,
    },
}

#[derive(Clone, Copy, Debug)]
enum View {
    Summary,
    Describe,
    HomeAway,
    WinLoss,
    Chart,
}

impl std::str::FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(View::Summary),
            "describe" => Ok(View::Describe),
            "home-away" | "home_away" => Ok(View::HomeAway),
            "win-loss" | "win_loss" => Ok(View::WinLoss),
            "chart" => Ok(View::Chart),
            _ => Err(format!(
                "Unknown view: {}. Use summary, describe, home-away, win-loss or chart.",
                s
            )),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Sync {
                team,
                player,
                roster,
                standings,
                season,
            } => commands::data_sync(&config, team, player, roster, standings, &season),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Teams => commands::teams(),
        Commands::Standings { season } => commands::standings(&config, cli.live, &season),
        Commands::Results { team, season } => commands::results(&config, cli.live, &team, &season),
        Commands::Stats { target } => commands::stats(&config, cli.live, target),
        Commands::Opponent {
            team,
            opponent,
            season,
        } => commands::opponent(&config, cli.live, &team, &opponent, &season),
        Commands::Predict { model } => match model {
            PredictCommands::Season { player } => {
                commands::predict_season(&config, cli.live, player)
            }
            PredictCommands::Linear { player, season } => {
                commands::predict_linear(&config, cli.live, player, &season)
            }
        },
        Commands::Export { target } => commands::export(&config, cli.live, target),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use nba::api;
    use nba::data::export::{export_csv, export_summary, BundleRow};
    use nba::data::{teams, Database, RetryPolicy, StatsApiClient, StatsSource};
    use nba::features::GameStat;
    use nba::service::StatsService;
    use nba::{EntityId, PlayerId, Season};
    use serde::Serialize;
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.export_dir)?;
        println!("Created {}", config.data.export_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'nba data sync --team NOP --roster' to fetch game logs");
        println!("  3. Run 'nba stats team NOP --view describe' for statistics");
        println!("  4. Run 'nba predict season <PLAYER_ID>' for a scoring forecast");

        Ok(())
    }

    fn api_client(config: &Config) -> Result<StatsApiClient> {
        StatsApiClient::new(&config.api, RetryPolicy::from_config(&config.retry))
    }

    /// Service over the live provider or the local mirror
    fn service(config: &Config, live: bool) -> Result<StatsService> {
        let source: Box<dyn StatsSource> = if live {
            Box::new(api_client(config)?)
        } else {
            Box::new(Database::open(&config.data.database_path)?)
        };
        Ok(StatsService::new(source, config.clone()))
    }

    /// Print a result through the response boundary
    fn emit<T: Serialize>(result: Result<T>) -> Result<()> {
        let response = api::respond(result);
        println!("{}", serde_json::to_string_pretty(&response.body)?);
        if !response.is_success() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn parse_team(query: &str) -> Result<nba::Team> {
        teams::lookup(query)
    }

    pub fn data_sync(
        config: &Config,
        team: Option<String>,
        player: Option<i64>,
        roster: bool,
        standings: bool,
        season: &str,
    ) -> Result<()> {
        let season = Season::parse(season)?;
        let db = Database::open(&config.data.database_path)?;
        let client = api_client(config)?;

        if let Some(query) = team {
            let team = parse_team(&query)?;
            println!("Syncing {} for {}...", team.name, season);
            let games = client.team_game_log(team.id, &season)?;
            let count = db.replace_games(EntityId::Team(team.id), &season, &games)?;
            println!("Stored {} team games", count);

            if roster {
                let players = client.team_roster(team.id, &season)?;
                db.replace_roster(team.id, &season, &players)?;
                let logs = nba::data::bulk::roster_game_logs(
                    &client,
                    team.id,
                    &season,
                    config.bulk.workers,
                )?;
                for (player, games) in &logs {
                    db.replace_games(EntityId::Player(*player), &season, games)?;
                }
                println!("Stored game logs for {}/{} players", logs.len(), players.len());
            }
        }

        if let Some(id) = player {
            let player = PlayerId(id);
            let games = client.player_game_log(player, &season)?;
            db.replace_games(EntityId::Player(player), &season, &games)?;
            let career = client.player_career(player)?;
            db.replace_career(player, &career)?;
            println!(
                "Stored {} games and {} career seasons for player {}",
                games.len(),
                career.len(),
                id
            );
        }

        if standings {
            let rows = client.standings(&season)?;
            let count = db.replace_standings(&season, &rows)?;
            println!("Stored standings for {} teams", count);
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:       {}", config.data.database_path);
        println!("  Games:      {} ({} logs)", stats.game_count, stats.game_log_count);
        println!("  Careers:    {}", stats.career_player_count);
        println!("  Standings:  {} seasons", stats.standings_season_count);
        println!("  Rosters:    {} players", stats.roster_player_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:      {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn teams() -> Result<()> {
        for (conference, teams) in teams::by_conference() {
            println!("{}", conference);
            println!("───────────────────────────────");
            for team in teams {
                println!("  {:<4} {:<26} {}", team.abbreviation, team.name, team.id.0);
            }
            println!();
        }
        Ok(())
    }

    pub fn standings(config: &Config, live: bool, season: &str) -> Result<()> {
        let service = service(config, live)?;
        let season = Season::parse(season)?;
        for (conference, rows) in service.standings(&season)? {
            println!("{} {}", conference, season);
            println!("───────────────────────────────────────────");
            for (i, row) in rows.iter().enumerate() {
                println!(
                    "  {:>2}. {:<26} {:>2}-{:<2} {}",
                    row.playoff_rank.unwrap_or(i as u32 + 1),
                    row.team_name,
                    row.wins,
                    row.losses,
                    row.effective_win_pct()
                        .map(|p| format!("{:.3}", p))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            println!();
        }
        Ok(())
    }

    pub fn results(config: &Config, live: bool, team: &str, season: &str) -> Result<()> {
        let season = Season::parse(season)?;
        let team = parse_team(team)?;
        emit(service(config, live)?.team_results(team.id, &season))
    }

    fn resolve(target: &StatsTarget) -> Result<(EntityId, Season, View, GameStat, Option<usize>)> {
        match target {
            StatsTarget::Team {
                team,
                season,
                view,
                stat,
                window,
            } => Ok((
                EntityId::Team(parse_team(team)?.id),
                Season::parse(season)?,
                *view,
                stat.parse()?,
                *window,
            )),
            StatsTarget::Player {
                id,
                season,
                view,
                stat,
                window,
            } => Ok((
                EntityId::Player(PlayerId(*id)),
                Season::parse(season)?,
                *view,
                stat.parse()?,
                *window,
            )),
        }
    }

    pub fn stats(config: &Config, live: bool, target: StatsTarget) -> Result<()> {
        let (entity, season, view, stat, window) = resolve(&target)?;
        let service = service(config, live)?;
        match view {
            View::Summary => emit(service.summary(entity, &season).map(|s| s.report())),
            View::Describe => emit(service.describe_stat(entity, &season, stat)),
            View::HomeAway => emit(service.home_away(entity, &season)),
            View::WinLoss => emit(service.win_loss(entity, &season)),
            View::Chart => emit(service.chart(entity, &season, stat, window)),
        }
    }

    pub fn opponent(
        config: &Config,
        live: bool,
        team: &str,
        opponent: &str,
        season: &str,
    ) -> Result<()> {
        let season = Season::parse(season)?;
        let team = parse_team(team)?;
        emit(service(config, live)?.against_opponent(EntityId::Team(team.id), &season, opponent))
    }

    pub fn predict_season(config: &Config, live: bool, player: i64) -> Result<()> {
        emit(service(config, live)?.season_forecast(PlayerId(player)))
    }

    pub fn predict_linear(config: &Config, live: bool, player: i64, season: &str) -> Result<()> {
        let season = Season::parse(season)?;
        emit(service(config, live)?.linear_forecast(PlayerId(player), &season))
    }

    pub fn export(config: &Config, live: bool, target: StatsTarget) -> Result<()> {
        let (entity, season, _, _, _) = resolve(&target)?;
        let service = service(config, live)?;
        let dir = Path::new(&service.config().data.export_dir);
        let prefix = match entity {
            EntityId::Team(id) => teams::find_by_id(id)
                .map(|t| t.abbreviation)
                .unwrap_or_else(|| id.0.to_string()),
            EntityId::Player(id) => format!("player_{}", id.0),
        };
        let stem = format!("{}_{}", prefix, season);

        let games = service.games(entity, &season)?;
        let path = export_csv(dir, &format!("{}_games", stem), &games)?;
        println!("Wrote {}", path.display());

        let bundles: Vec<BundleRow> = service
            .describe_all(entity, &season)?
            .iter()
            .map(|(stat, bundle)| BundleRow::new(stat, bundle))
            .collect();
        let path = export_csv(dir, &format!("{}_statistics", stem), &bundles)?;
        println!("Wrote {}", path.display());

        let report = service.summary(entity, &season)?.report();
        let path = export_summary(dir, &format!("{}_summary", stem), &report)?;
        println!("Wrote {}", path.display());

        Ok(())
    }
}
