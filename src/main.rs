//! Command line entry point for the rating ledger
//!
//! Replays a season file through the engine and prints one report as JSON.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use rating_ledger::config::AppConfig;
use rating_ledger::service::{SeasonFile, SeasonReplay};
use rating_ledger::types::{CompetitionId, PlayerId};
use std::path::PathBuf;
use tracing::{error, info};

/// Report printed after the replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    /// Teams by current score
    Leaderboard,
    /// Head-to-head, fairness, recent games, streaks and weekly activity of one player
    Player,
    /// Per-game skill and position of every player
    Trajectory,
    /// Most recent games
    Latest,
}

/// Rating Ledger - TrueSkill rating and history engine
#[derive(Parser)]
#[command(
    name = "rating-ledger",
    version,
    about = "Replay a season of team-vs-team games and report ratings and statistics",
    long_about = "Rating Ledger records decisive team-vs-team games, keeps a TrueSkill rating \
                 per team and competition and an append-only history of post-game scores. \
                 This binary replays a season file through the engine and prints a JSON report."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Season to replay
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Season file with players, competitions and games (JSON or TOML)"
    )]
    season: Option<PathBuf>,

    /// Competition to report on
    #[arg(
        long,
        value_name = "NAME",
        help = "Competition name (defaults to the first declared)"
    )]
    competition: Option<String>,

    /// Report to print
    #[arg(short, long, value_enum, default_value_t = Report::Leaderboard)]
    report: Report,

    /// Player for the player report
    #[arg(short, long, value_name = "ID")]
    player: Option<PlayerId>,

    /// Number of games for the trajectory and latest reports
    #[arg(short, long, value_name = "N")]
    games: Option<usize>,

    /// Games to skip before the trajectory window
    #[arg(long, value_name = "N", default_value_t = 0)]
    offset: usize,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and season, then exit)
    #[arg(long, help = "Validate configuration and season file without replaying")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with engine settings
fn display_startup_banner(config: &AppConfig) {
    info!("Rating Ledger {}", rating_ledger::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Prior: mu={} sigma={:.3}",
        config.rating.initial_mu, config.rating.initial_sigma
    );
    info!(
        "   beta={:.3} tau={:.3} draw={}",
        config.rating.beta, config.rating.tau, config.rating.draw_probability
    );
    info!("   Eligibility: {:?}", config.engine.eligibility);
}

/// Load configuration from file or environment, then apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    rating_ledger::config::validate_config(&config)?;
    Ok(config)
}

async fn select_competition(
    replay: &SeasonReplay,
    season: &SeasonFile,
    args: &Args,
) -> Result<CompetitionId> {
    let name = match &args.competition {
        Some(name) => name.as_str(),
        None => season
            .competitions
            .first()
            .map(|competition| competition.name.as_str())
            .ok_or_else(|| anyhow!("Season declares no competitions"))?,
    };

    replay
        .service()
        .queries()
        .competition_by_name(name)
        .await?
        .map(|competition| competition.id)
        .ok_or_else(|| anyhow!("Unknown competition: {}", name))
}

async fn print_report(
    replay: &SeasonReplay,
    competition_id: CompetitionId,
    args: &Args,
) -> Result<()> {
    let service = replay.service();

    let output = match args.report {
        Report::Leaderboard => {
            let entries = service.queries().leaderboard(competition_id).await?;
            let ids: Vec<PlayerId> = entries
                .iter()
                .flat_map(|entry| entry.team.players.iter().cloned())
                .collect();
            let names = service.display_names(&ids).await?;

            let rows: Vec<serde_json::Value> = entries
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "rank": entry.rank,
                        "team": entry.team.label(&names),
                        "mu": entry.score.mu,
                        "sigma": entry.score.sigma,
                        "wins": entry.score.wins,
                        "defeats": entry.score.defeats,
                    })
                })
                .collect();
            serde_json::Value::Array(rows)
        }
        Report::Player => {
            let player_id = args
                .player
                .as_deref()
                .ok_or_else(|| anyhow!("--player is required for the player report"))?;
            let report = service.player_report(player_id, competition_id).await?;
            serde_json::to_value(report)?
        }
        Report::Trajectory => {
            let count = args.games.unwrap_or(service.config().engine.latest_games_limit);
            let trajectory = service
                .stats()
                .latest_results_by_player(competition_id, count, args.offset)
                .await?;
            let ids: Vec<PlayerId> = trajectory.series.keys().cloned().collect();
            let names = service.display_names(&ids).await?;
            trajectory.to_json(&names)?
        }
        Report::Latest => {
            let games = service
                .queries()
                .latest_games(competition_id, args.games)
                .await?;
            let ids: Vec<PlayerId> = games
                .iter()
                .flat_map(|game| game.winner.players.iter().chain(game.loser.players.iter()))
                .cloned()
                .collect();
            let names = service.display_names(&ids).await?;

            let rows: Vec<serde_json::Value> = games
                .iter()
                .map(|game| {
                    serde_json::json!({
                        "game": game.id,
                        "date": game.date.to_rfc3339(),
                        "result": game.describe(&names),
                    })
                })
                .collect();
            serde_json::Value::Array(rows)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let season_path = args
        .season
        .clone()
        .ok_or_else(|| anyhow!("--season is required unless --dry-run is given"))?;

    let season = SeasonFile::from_path(&season_path)?;
    info!(
        "Loaded season {} - {} games",
        season_path.display(),
        season.games.len()
    );

    let replay = SeasonReplay::load(config, &season).await?;
    let summary = replay.run(&season).await?;
    info!(
        "Replay finished - {} recorded, {} rejected",
        summary.recorded,
        summary.rejected_total()
    );

    let competition_id = select_competition(&replay, &season, &args).await?;
    print_report(&replay, competition_id, &args).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        if let Some(season_path) = &args.season {
            let season = SeasonFile::from_path(season_path)?;
            info!(
                "Season file valid - {} players, {} competitions, {} games",
                season.players.len(),
                season.competitions.len(),
                season.games.len()
            );
        }
        info!("Dry run completed - exiting without replaying");
        return Ok(());
    }

    if let Err(e) = run(args, config).await {
        error!("Replay failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
