//! Hobart CLI binary.
//!
//! Computes residual returns, market betas and event studies from CSV inputs, caching
//! computed panels between runs.

mod cache_manager;
mod error;
mod loader;
mod output;

use cache_manager::{CacheOptions, clear_cache, open_cache, print_cache_info};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use error::CliError;
use hobart::{
    EventStudyService, MarketFactorService, ProgressHook, ResidualReturnsService, SignalConfig,
    StaticFactors,
};
use hobart_data::{Asset, InMemoryMarketData, MarketDataProvider, PanelCache, PriceField};
use indicatif::{ProgressBar, ProgressStyle};
use output::Format;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: residual returns, market betas and event studies", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local cache directory (default: platform cache directory)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Read-only SQLite distribution file used as the remote cache tier
    #[arg(long, global = true)]
    remote_db: Option<PathBuf>,

    /// Disable caching (compute everything in memory)
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rolling residual returns against the benchmark, or a factor model with --factors
    Residuals {
        /// Returns CSV (date,sid,symbol,open_return,close_return)
        #[arg(long)]
        returns: PathBuf,

        /// First date (inclusive)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date (inclusive)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Comma-separated tickers (default: all)
        #[arg(long, value_delimiter = ',')]
        assets: Vec<String>,

        /// Price the returns are measured on
        #[arg(long, value_enum, default_value_t = Field::Close)]
        field: Field,

        /// Factor returns CSV (date,<factors...>) for multi-factor residuals
        #[arg(long)]
        factors: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Rolling market alpha and beta on close-to-close returns
    Betas {
        /// Returns CSV (date,sid,symbol,open_return,close_return)
        #[arg(long)]
        returns: PathBuf,

        /// First date (inclusive)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date (inclusive)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Comma-separated tickers (default: all)
        #[arg(long, value_delimiter = ',')]
        assets: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Average residual returns around events, by event group
    EventStudy {
        /// Returns CSV (date,sid,symbol,open_return,close_return)
        #[arg(long)]
        returns: PathBuf,

        /// Events CSV (date,symbol,<group columns...>)
        #[arg(long)]
        events: PathBuf,

        /// Price the returns are measured on
        #[arg(long, value_enum, default_value_t = Field::Close)]
        field: Field,

        /// Sessions before each event
        #[arg(long, default_value = "10")]
        days_before: u32,

        /// Sessions after each event
        #[arg(long, default_value = "5")]
        days_after: u32,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show or clear the local cache
    Cache {
        /// Delete every locally cached panel
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Field {
    /// Open-to-open returns
    Open,
    /// Close-to-close returns
    Close,
}

impl From<Field> for PriceField {
    fn from(field: Field) -> Self {
        match field {
            Field::Open => Self::Open,
            Field::Close => Self::Close,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => SignalConfig::from_json_file(path)?,
        None => SignalConfig::default(),
    };
    let cache_options = CacheOptions {
        cache_dir: cli.cache_dir,
        remote_db: cli.remote_db,
        remote_prefix: config.remote_prefix.clone(),
        disabled: cli.no_cache,
    };

    match cli.command {
        Commands::Residuals {
            returns,
            start,
            end,
            assets,
            field,
            factors,
            format,
        } => {
            let market = load_market(&returns)?;
            let cache = open_cache(&cache_options)?;
            let factors = factors
                .as_deref()
                .map(load_factor_model)
                .transpose()?;
            let selected = resolve_assets(&*market, &assets)?;
            let multi_factor = factors.is_some();

            let pb = progress_bar("Regressing residual returns...");
            let service = residual_service(market, cache, factors, config)
                .with_progress(progress_hook(&pb));
            let panel = if multi_factor {
                service.get_multi_factor_residual_returns(
                    start,
                    end,
                    selected.as_deref(),
                    field.into(),
                )?
            } else {
                service.get_market_neutral_residual_returns(
                    start,
                    end,
                    selected.as_deref(),
                    field.into(),
                )?
            };
            pb.finish_and_clear();
            output::write_panel(&panel, format, io::stdout().lock())?;
        }
        Commands::Betas {
            returns,
            start,
            end,
            assets,
            format,
        } => {
            let market = load_market(&returns)?;
            let cache = open_cache(&cache_options)?;
            let selected = resolve_assets(&*market, &assets)?;

            let pb = progress_bar("Regressing market betas...");
            let service = MarketFactorService::new(market.clone(), cache, market, config)
                .with_progress(progress_hook(&pb));
            let panel = service.get_market_factors(start, end, selected.as_deref())?;
            pb.finish_and_clear();
            output::write_panel(&panel, format, io::stdout().lock())?;
        }
        Commands::EventStudy {
            returns,
            events,
            field,
            days_before,
            days_after,
            format,
        } => {
            let market = load_market(&returns)?;
            let cache = open_cache(&cache_options)?;
            let events = loader::load_events(&events, &*market)?;
            info!(events = events.len(), groups = ?events.group_columns(), "loaded events");

            let pb = progress_bar("Regressing residual returns...");
            let residuals = residual_service(market, cache, None, config)
                .with_progress(progress_hook(&pb));
            let study = EventStudyService::new(Arc::new(residuals));
            let result = study.run_event_study(&events, field.into(), days_before, days_after)?;
            pb.finish_and_clear();
            output::write_event_study(&result, format, io::stdout().lock())?;
        }
        Commands::Cache { clear } => {
            if clear {
                let removed = clear_cache(&cache_options)?;
                println!("Removed {removed} cached panel(s)");
            } else {
                println!("Hobart cache");
                print_cache_info(&cache_options)?;
            }
        }
    }

    Ok(())
}

fn load_market(path: &Path) -> Result<Arc<InMemoryMarketData>, CliError> {
    let panel = loader::load_returns(path)?;
    info!(
        path = %path.display(),
        rows = panel.len(),
        assets = panel.assets().len(),
        "loaded returns"
    );
    Ok(Arc::new(InMemoryMarketData::from_returns(panel)?))
}

fn load_factor_model(path: &Path) -> Result<Arc<StaticFactors>, CliError> {
    let series = loader::load_factors(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("factors")
        .to_string();
    info!(
        model = %name,
        factors = ?series.columns(),
        dates = series.len(),
        "loaded factor returns"
    );
    Ok(Arc::new(StaticFactors::new(name, series)))
}

fn resolve_assets(
    market: &dyn MarketDataProvider,
    tickers: &[String],
) -> Result<Option<Vec<Asset>>, CliError> {
    if tickers.is_empty() {
        return Ok(None);
    }
    let tickers: Vec<&str> = tickers.iter().map(|t| t.trim()).collect();
    Ok(Some(market.get_assets(&tickers)?))
}

/// Residual service over the returns file: the universe is every asset in it.
fn residual_service(
    market: Arc<InMemoryMarketData>,
    cache: Arc<dyn PanelCache>,
    factors: Option<Arc<StaticFactors>>,
    config: SignalConfig,
) -> ResidualReturnsService {
    ResidualReturnsService::new(
        market.clone(),
        cache,
        market,
        factors.map(|f| f as Arc<dyn hobart::FactorProvider>),
        config,
    )
}

fn progress_bar(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message(message);
    pb
}

fn progress_hook(pb: &ProgressBar) -> ProgressHook {
    let pb = pb.clone();
    Arc::new(move |completed, total| {
        pb.set_length(total as u64);
        pb.set_position(completed as u64);
    })
}
