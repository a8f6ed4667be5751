//! Command line runner for the league rating engine
//!
//! Loads a JSON document store, runs a full or incremental calculation (or
//! computes Swiss standings), writes the store back and prints the result as
//! JSON on stdout.

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use league_ratings::config::AppConfig;
use league_ratings::metrics::MetricsCollector;
use league_ratings::processing::{
    CancellationHandle, ChronologicalProcessor, Repositories, RunRequest,
};
use league_ratings::ranking::season_standings;
use league_ratings::repository::{Dataset, InMemoryStore};
use league_ratings::types::RunMode;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// League rating engine
#[derive(Parser)]
#[command(
    name = "league-ratings",
    version,
    about = "Chronological skill ratings, rankings and Swiss standings for a multi-season league"
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

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Data file override
    #[arg(long, value_name = "FILE", help = "JSON document store to read and update")]
    data_file: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and data file, then exit")]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reprocess every round, resetting round tracking
    Full(RunArgs),
    /// Apply only rounds not yet calculated, resuming from the latest snapshot
    Incremental(RunArgs),
    /// Print Swiss standings for one season
    Swiss {
        #[arg(long, value_name = "SEASON")]
        season: String,
    },
}

#[derive(ClapArgs)]
struct RunArgs {
    /// Restrict the run to these seasons
    #[arg(long = "season", value_name = "SEASON")]
    seasons: Vec<String>,

    /// Disable inactivity decay for this run
    #[arg(long)]
    no_decay: bool,

    /// Index of the first season to load, 0 = earliest
    #[arg(long, value_name = "INDEX")]
    start_index: Option<usize>,

    /// Games that count toward totals but not toward ratings
    #[arg(long = "exclude-game", value_name = "GAME")]
    excluded_games: Vec<String>,
}

impl RunArgs {
    fn into_request(self, mode: RunMode) -> RunRequest {
        let mut request = RunRequest::new(mode)
            .with_seasons(self.seasons)
            .excluding_from_rating(self.excluded_games);
        if self.no_decay {
            request = request.without_decay();
        }
        if let Some(index) = self.start_index {
            request = request.starting_at(index);
        }
        request
    }
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
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

    if let Some(data_file) = &args.data_file {
        config.storage.data_file = data_file.clone();
    }

    league_ratings::config::validate_config(&config)?;
    Ok(config)
}

/// Cancel the run at the next round boundary on Ctrl+C
fn cancel_on_interrupt(handle: CancellationHandle) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current round");
                handle.cancel();
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
        }
    });
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let data_file = config.storage.data_file.clone();
    let dataset = Dataset::from_file(&data_file)?;
    info!(
        "Loaded {} seasons, {} teams and {} games from {}",
        dataset.seasons.len(),
        dataset.teams.len(),
        dataset.games.len(),
        data_file.display()
    );

    if args.dry_run {
        info!("Configuration and data file are valid");
        return Ok(());
    }

    let store = Arc::new(InMemoryStore::from_dataset(dataset));

    let request = match args.command {
        Command::Full(run_args) => run_args.into_request(RunMode::Full),
        Command::Incremental(run_args) => run_args.into_request(RunMode::Incremental),
        Command::Swiss { season } => {
            let standings = season_standings(store.as_ref(), &season).await?;
            println!("{}", serde_json::to_string_pretty(&standings)?);
            return Ok(());
        }
    };

    let metrics = Arc::new(MetricsCollector::new()?);
    let processor =
        ChronologicalProcessor::new(Repositories::from_store(store.clone()), &config, metrics)?;

    let cancel = CancellationHandle::new();
    cancel_on_interrupt(cancel.clone());

    let summary = processor.run_with_cancellation(request, cancel).await?;

    store.dataset()?.write_file(&data_file)?;
    info!("Wrote updated store to {}", data_file.display());

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
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

    info!("{} v{}", config.service.name, league_ratings::VERSION);

    if let Err(e) = run(args, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
