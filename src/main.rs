//! Money Market Risk - CLI entry point
//!
//! Reads a position snapshot as JSON and prints aggregated risk metrics.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use money_market_risk::config::{AnalysisConfig, Config};
use money_market_risk::position::{PositionChange, PositionSnapshot};
use money_market_risk::risk::{
    apr_to_apy, AggregationEngine, CompoundingFrequency, ModeConstraintEngine,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Money market position risk CLI
#[derive(Parser)]
#[command(name = "mmrisk")]
#[command(version, about = "Risk aggregation for money-market positions")]
struct Cli {
    /// Analysis profile (defaults to the configured default profile)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Also write logs to an hourly rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the risk metrics of a position
    Aggregate {
        /// Path to the position snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Path to a list of position changes to simulate first (JSON)
        #[arg(short, long)]
        changes: Option<PathBuf>,
    },

    /// Check whether a position could enter a risk category
    Category {
        /// Path to the position snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Candidate category id (0 leaves every category)
        #[arg(short, long)]
        id: u32,
    },

    /// Show how much of an asset the position can still borrow
    MaxBorrow {
        /// Path to the position snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Asset symbol to borrow
        #[arg(long)]
        symbol: String,
    },

    /// Convert an APR to APY
    Apy {
        /// Simple annual rate in percent
        #[arg(short, long)]
        apr: Decimal,

        /// daily, hourly, per-second, or periods per year
        #[arg(short, long)]
        frequency: Option<CompoundingFrequency>,
    },

    /// List the available analysis profiles
    Profiles,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BorrowCapacity<'a> {
    symbol: &'a str,
    can_borrow: bool,
    max_amount: Decimal,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref())?;

    let config = Config::load()?;
    let profile_name = cli
        .profile
        .as_deref()
        .unwrap_or(config.default_profile.as_str());
    let analysis = config.profile(cli.profile.as_deref())?;
    debug!(profile = profile_name, "Using analysis profile");

    match cli.command {
        Commands::Aggregate { snapshot, changes } => {
            let snapshot = read_snapshot(&snapshot)?;
            let engine = AggregationEngine::from_config(analysis);
            let result = match changes {
                Some(path) => {
                    let changes: Vec<PositionChange> = read_json(&path)?;
                    info!(changes = changes.len(), "Simulating position changes");
                    engine.aggregate_after(&snapshot, &changes, analysis)?
                }
                None => engine.aggregate(&snapshot, analysis)?,
            };
            print_json(&result)
        }
        Commands::Category { snapshot, id } => {
            let snapshot = read_snapshot(&snapshot)?;
            let engine = AggregationEngine::from_config(analysis);
            let check = ModeConstraintEngine::new(&engine, analysis).can_enter_category(&snapshot, id)?;
            print_json(&check)
        }
        Commands::MaxBorrow { snapshot, symbol } => {
            let snapshot = read_snapshot(&snapshot)?;
            let engine = AggregationEngine::from_config(analysis);
            let result = engine.aggregate(&snapshot, analysis)?;
            let modes = ModeConstraintEngine::new(&engine, analysis);
            print_json(&BorrowCapacity {
                symbol: &symbol,
                can_borrow: modes.can_borrow(&snapshot, &symbol)?,
                max_amount: modes.max_borrowable(&snapshot, &symbol, &result)?,
            })
        }
        Commands::Apy { apr, frequency } => {
            let frequency = frequency.unwrap_or(analysis.compounding);
            let apy = apr_to_apy(apr, frequency)?;
            println!("{} ({frequency})", apy.round_dp(4));
            Ok(())
        }
        Commands::Profiles => {
            for (name, profile) in &config.profiles {
                print_profile(name, profile, name == &config.default_profile);
            }
            Ok(())
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_snapshot(path: &Path) -> Result<PositionSnapshot> {
    let snapshot: PositionSnapshot = read_json(path)?;
    info!(
        used_assets = snapshot.used_assets.len(),
        markets = snapshot.market.len(),
        active_category = snapshot.active_category,
        "Loaded position snapshot"
    );
    Ok(snapshot)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_profile(name: &str, profile: &AnalysisConfig, is_default: bool) {
    let marker = if is_default { " (default)" } else { "" };
    println!("{name}{marker}");
    println!("   Resolution: {:?}", profile.resolution);
    println!("   Dust Threshold: ${}", profile.dust_threshold_usd);
    println!("   Compounding: {}", profile.compounding);
    println!("   Volatile Pairs: {}", profile.classify_volatile_pairs);
}

/// Initialize logging to stderr, and to a rolling file when requested.
///
/// Stdout is reserved for command output.
fn init_logging(log_dir: Option<&Path>) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let filter = EnvFilter::from_default_env()
        .add_directive("money_market_risk=info".parse()?)
        .add_directive(Level::WARN.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::hourly(dir, "mmrisk.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the program duration
            Box::leak(Box::new(guard));

            builder
                .with_writer(std::io::stderr.and(file_writer))
                .with_ansi(false)
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
