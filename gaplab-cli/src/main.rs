//! GapLab CLI — scan, backtest, analyze, compare and gap-screen commands.
//!
//! Commands:
//! - `scan` — one ticker on one day, printing the full scan payload as JSON
//! - `backtest` — many tickers over a date range, with optional run artifacts
//! - `analyze` — metrics report for a saved trade-result file
//! - `compare` — side-by-side metrics for several trade-result files
//! - `gaps` — data coverage and the largest session gaps in a bar store

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gaplab_core::synthetic::SyntheticConfig;
use gaplab_runner::gap_screen::{DEFAULT_LIMIT, DEFAULT_MIN_ABS_GAP};
use gaplab_runner::{
    compare, read_trades, render_comparison, render_report, run_backtest, save_run_artifacts,
    scan_ticker_date, screen_gaps, BacktestConfig, BarStore, CsvBarStore, MetricsReport,
    NamedResultsFile, SyntheticBarStore,
};

/// Calendar days of synthetic history generated before `--start`, so the
/// first requested day has a prior session.
const SYNTHETIC_LEAD_DAYS: i64 = 7;

#[derive(Parser)]
#[command(
    name = "gaplab",
    about = "GapLab CLI — gap + VWAP-reclaim scanner and backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one ticker on one day and print the scan payload as JSON.
    Scan {
        #[arg(long)]
        ticker: String,

        /// Session date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Directory of <TICKER>.csv bar files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the scanner and simulator over tickers and a date range.
    Backtest {
        /// Tickers to run. Defaults to every CSV in --data-dir.
        #[arg(long, num_args = 1..)]
        tickers: Vec<String>,

        /// First session date (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last session date (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        /// Directory of <TICKER>.csv bar files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Write trades, signals, summary and report here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Use seeded synthetic sessions instead of --data-dir.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Print a metrics report for a trade-result file.
    Analyze {
        file: PathBuf,
    },
    /// Compare several trade-result files, given as NAME=FILE.
    Compare {
        #[arg(required = true)]
        sets: Vec<NamedResultsFile>,
    },
    /// Show data coverage and the largest session gaps.
    Gaps {
        /// Tickers to screen. Defaults to every CSV in --data-dir.
        #[arg(long, num_args = 1..)]
        tickers: Vec<String>,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Only list gaps larger than this, in percent.
        #[arg(long, default_value_t = DEFAULT_MIN_ABS_GAP)]
        min_abs_gap: f64,

        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("gaplab=info,gaplab_core=info,gaplab_runner=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            ticker,
            date,
            data_dir,
            config,
        } => run_scan(&ticker, date, &data_dir, config.as_deref()),
        Commands::Backtest {
            tickers,
            start,
            end,
            data_dir,
            config,
            output_dir,
            synthetic,
        } => run_backtest_cmd(
            tickers,
            start,
            end,
            &data_dir,
            config.as_deref(),
            output_dir.as_deref(),
            synthetic,
        ),
        Commands::Analyze { file } => run_analyze(&file),
        Commands::Compare { sets } => run_compare(&sets),
        Commands::Gaps {
            tickers,
            start,
            end,
            data_dir,
            config,
            min_abs_gap,
            limit,
        } => run_gaps(
            tickers,
            start,
            end,
            &data_dir,
            config.as_deref(),
            min_abs_gap,
            limit,
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

/// Explicit tickers, or every ticker with a CSV file in the store.
fn resolve_tickers(tickers: Vec<String>, store: &CsvBarStore) -> Result<Vec<String>> {
    if !tickers.is_empty() {
        return Ok(tickers);
    }
    let found = store.tickers()?;
    if found.is_empty() {
        bail!("no tickers given and no CSV files found in the data directory");
    }
    Ok(found)
}

fn run_scan(ticker: &str, date: NaiveDate, data_dir: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let store = CsvBarStore::new(data_dir);
    let outcome = scan_ticker_date(&store, ticker, date, &config);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if let Some(err) = &outcome.error {
        bail!("scan failed for {ticker} {date}: {err}");
    }
    Ok(())
}

fn run_backtest_cmd(
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    data_dir: &Path,
    config: Option<&Path>,
    output_dir: Option<&Path>,
    synthetic: bool,
) -> Result<()> {
    let config = load_config(config)?;

    let csv_store;
    let synthetic_store;
    let (store, tickers): (&dyn BarStore, Vec<String>) = if synthetic {
        if tickers.is_empty() {
            bail!("--synthetic requires --tickers");
        }
        let Some(interval_minutes) = config.data.interval_minutes() else {
            bail!("unsupported timeframe '{}'", config.data.timeframe);
        };
        synthetic_store = SyntheticBarStore::new(
            start - Duration::days(SYNTHETIC_LEAD_DAYS),
            end,
            config.session,
            SyntheticConfig {
                interval_minutes,
                ..SyntheticConfig::default()
            },
        );
        (&synthetic_store, tickers)
    } else {
        csv_store = CsvBarStore::new(data_dir);
        let tickers = resolve_tickers(tickers, &csv_store)?;
        (&csv_store, tickers)
    };

    let result = run_backtest(store, &tickers, start, end, &config)?;

    let short_id = result.run_id.get(..12).unwrap_or(&result.run_id);
    let title = if result.has_synthetic {
        format!("GapLab Run {short_id} (SYNTHETIC DATA)")
    } else {
        format!("GapLab Run {short_id}")
    };
    println!("{}", render_report(&title, &result.metrics));
    println!(
        "Days scanned: {} | Signals: {} | Skipped: {} insufficient data, {} gap not met, {} no qualifying bar",
        result.days_scanned,
        result.signals.len(),
        result.skipped.insufficient_data,
        result.skipped.gap_not_met,
        result.skipped.no_qualifying_bar,
    );
    for failure in &result.errors {
        eprintln!("Error for {}: {}", failure.ticker, failure.message);
    }

    if let Some(dir) = output_dir {
        save_run_artifacts(&result, dir)?;
        info!(dir = %dir.display(), "artifacts saved");
        println!("Artifacts saved to: {}", dir.display());
    }

    Ok(())
}

fn run_analyze(file: &Path) -> Result<()> {
    let trades = read_trades(file).with_context(|| format!("failed to read {}", file.display()))?;
    let metrics = MetricsReport::aggregate(&trades);
    println!("{}", render_report(&file.display().to_string(), &metrics));
    Ok(())
}

fn run_compare(sets: &[NamedResultsFile]) -> Result<()> {
    let mut loaded = Vec::with_capacity(sets.len());
    for set in sets {
        let trades = read_trades(&set.path)
            .with_context(|| format!("failed to read {} ({})", set.path.display(), set.name))?;
        loaded.push((set.name.clone(), trades));
    }
    println!("{}", render_comparison(&compare(&loaded)));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_gaps(
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    data_dir: &Path,
    config: Option<&Path>,
    min_abs_gap: f64,
    limit: usize,
) -> Result<()> {
    let config = load_config(config)?;
    let store = CsvBarStore::new(data_dir);
    let tickers = resolve_tickers(tickers, &store)?;
    let screen = screen_gaps(
        &store,
        &tickers,
        start,
        end,
        &config.session,
        min_abs_gap,
        limit,
    );

    println!("{:<8} {:>8} {:>8} {:<12} {:<12}", "Ticker", "Sessions", "Bars", "First", "Last");
    println!("{}", "-".repeat(52));
    for cov in &screen.coverage {
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<8} {:>8} {:>8} {:<12} {:<12}",
            cov.ticker,
            cov.sessions,
            cov.bars,
            date(cov.first_date),
            date(cov.last_date)
        );
    }

    println!();
    println!("Gaps larger than {min_abs_gap:.2}% (top {limit}):");
    println!("{:<8} {:<12} {:>10} {:>10} {:>8}", "Ticker", "Date", "Prev Close", "Open", "Gap");
    println!("{}", "-".repeat(52));
    for row in &screen.rows {
        println!(
            "{:<8} {:<12} {:>10.2} {:>10.2} {:>+7.2}%",
            row.ticker,
            row.date.to_string(),
            row.previous_close,
            row.session_open,
            row.gap_percent
        );
    }

    for failure in &screen.errors {
        eprintln!("Error for {}: {}", failure.ticker, failure.message);
    }
    Ok(())
}
