//! roomscout CLI
//!
//! Local entry point for checking a configuration, inspecting the search area
//! and running listing batches through the pipeline.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use roomscout::{
    config::{self, EnvSource, ProcessEnv},
    error::{AppError, Result},
    geo::{self, GeoEnrichmentCache, GeoTable, GoogleMapsProvider},
    models::{Config, Coordinate, Listing},
    pipeline::{
        ConfigChangeDetector, PipelineContext, Presenter, RuleSet, SeenListings, process,
    },
    storage::StorageDirs,
    utils::http,
};

/// roomscout - rental listing pipeline
#[derive(Parser, Debug)]
#[command(
    name = "roomscout",
    version,
    about = "Filter, deduplicate and enrich scraped rental listings"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "roomscout.toml")]
    config: PathBuf,

    /// Root data directory (overrides config and ROOMSCOUT_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration, blacklist regexes, search area and commute destinations
    Validate,

    /// Decode a search-area URL and optionally test a point against it
    Area {
        /// Share URL (default: search.location.map_developers_url)
        #[arg(long)]
        url: Option<String>,

        /// Point to test, as "lat,lon"
        #[arg(long)]
        point: Option<String>,
    },

    /// Run a batch of scraped listings through the pipeline
    Process {
        /// JSON file holding an array of listings
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show how many listings have been seen
    Seen,

    /// Wipe a persisted table
    Wipe {
        #[arg(value_enum)]
        table: Table,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Table {
    Seen,
    ConfigSnapshot,
    FeedUrl,
    AddressValidity,
    ApproximateAddresses,
    CommuteSummaries,
}

/// Prints presented listings as JSON on stdout.
struct StdoutPresenter;

#[async_trait]
impl Presenter for StdoutPresenter {
    async fn present(&self, listings: &[Listing]) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(listings)?);
        Ok(())
    }
}

/// Initialize logging with the resolved level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Config file if present, defaults otherwise. Commands that need a
/// complete configuration validate it themselves.
fn read_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}

async fn maps_provider(
    config: &Config,
    dirs: &StorageDirs,
    env: &dyn EnvSource,
) -> Result<Option<GoogleMapsProvider>> {
    if config.options.disable_google_maps_features {
        log::info!("Google Maps features are disabled");
        return Ok(None);
    }
    let client = http::create_client(&config.geo)?;
    let mut key = GoogleMapsProvider::api_key_store(dirs, env).await?;
    Ok(Some(GoogleMapsProvider::from_store(client, &mut key).await?))
}

/// Wiping a cache table needs no API key.
async fn wipe_geo(config: &Config, dirs: &StorageDirs, table: GeoTable) -> Result<()> {
    let provider = GoogleMapsProvider::new(http::create_client(&config.geo)?, String::new())?;
    GeoEnrichmentCache::open(provider, dirs, &ProcessEnv)
        .await?
        .clear(table)
        .await
}

async fn run(cli: Cli) -> Result<()> {
    let env = ProcessEnv;
    let config = read_config(&cli.config)?;
    let level = config::log_level(&config, cli.verbose.then_some("debug"), &env);
    init_logging(&level);

    let dirs = config::storage_dirs(&config, cli.data_dir.clone(), &env);
    log::debug!(
        "Data directories: {} (private), {} (common)",
        dirs.private.display(),
        dirs.common.display()
    );

    match cli.command {
        Command::Validate => {
            log::info!("Validating configuration...");
            let config = config::load_config(&cli.config)?;
            log::info!("✓ Config OK (price range, search area, blacklist regexes)");
            log::info!(
                "✓ {} blacklist rule(s), {} search circle(s)",
                RuleSet::compile(&config.search)?.len(),
                config.search.location.search_area()?.len()
            );

            if let Some(provider) = maps_provider(&config, &dirs, &env).await? {
                let mut geo = GeoEnrichmentCache::open(provider, &dirs, &env).await?;
                let invalid = geo
                    .validate_commute_destinations(&config.options.commute_destinations)
                    .await?;
                if let Some(address) = invalid.first() {
                    return Err(AppError::config(format!(
                        "Invalid address in options.commute_destinations: {address}"
                    )));
                }
                log::info!(
                    "✓ {} commute destination(s) OK",
                    config.options.commute_destinations.len()
                );
            }
            log::info!("All validations passed!");
        }

        Command::Area { url, point } => {
            let circles = match url {
                Some(url) => geo::decode_url(&url)?,
                None => config.search.location.search_area()?,
            };
            for (i, circle) in circles.iter().enumerate() {
                println!("#{i}: {circle}");
            }

            if let Some(raw) = point {
                let point = Coordinate::parse(&raw)
                    .ok_or_else(|| AppError::validation(format!("Not a lat,lon pair: {raw}")))?;
                match geo::contains(&circles, point) {
                    Some(circle) => println!("{point} is within {circle}"),
                    None => println!("{point} is outside the search area"),
                }
            }
        }

        Command::Process { input } => {
            let config = config::load_config(&cli.config)?;
            let raw = std::fs::read_to_string(&input)?;
            let listings: Vec<Listing> = serde_json::from_str(&raw)?;
            log::info!("Loaded {} listing(s) from {}", listings.len(), input.display());

            let provider = maps_provider(&config, &dirs, &env).await?;
            let mut ctx = PipelineContext::build(config, &dirs, &env, provider).await?;
            ctx.startup().await?;
            let stats = ctx.process_batch(listings, &StdoutPresenter).await?;
            log::info!(
                "Batch done: {} received, {} outside area, {} unseen, {} valid, {} invalid",
                stats.received,
                stats.outside_area,
                stats.unseen,
                stats.valid,
                stats.invalid
            );
        }

        Command::Seen => {
            let mut seen = SeenListings::open(&dirs, &env).await?;
            println!("{} listing(s) seen", seen.len().await?);
        }

        Command::Wipe { table } => {
            match table {
                Table::Seen => SeenListings::open(&dirs, &env).await?.clear().await?,
                Table::ConfigSnapshot => ConfigChangeDetector::for_run(&dirs).reset().await?,
                Table::FeedUrl => process::feed_url_store(&dirs, &env).await?.clear().await?,
                Table::AddressValidity => wipe_geo(&config, &dirs, GeoTable::AddressValidity).await?,
                Table::ApproximateAddresses => {
                    wipe_geo(&config, &dirs, GeoTable::ApproximateAddresses).await?
                }
                Table::CommuteSummaries => {
                    wipe_geo(&config, &dirs, GeoTable::CommuteSummaries).await?
                }
            }
            log::info!("Wiped {table:?}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(instruction) = e.shutdown_instruction() {
                println!("{instruction}");
                return ExitCode::SUCCESS;
            }
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
