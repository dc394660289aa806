//! Backtest runner — wires bar stores, scanner, simulator and metrics.
//!
//! Two entry points:
//! - `scan_ticker_date()`: one ticker on one day, with the full debug payload.
//! - `run_backtest()`: many tickers over a date range. Tickers are processed
//!   in parallel; each ticker's days run sequentially. Results are sorted by
//!   `(date, ticker)` so output does not depend on scheduling.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use gaplab_core::domain::{BarSeries, Signal, Trade};
use gaplab_core::scanner::{scan, ScanOutcome, SkipReason};
use gaplab_core::simulator::simulate;

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::MetricsReport;
use crate::store::BarStore;

/// Errors that stop a run before it starts. Per-ticker failures are recorded
/// in `RunResult::errors` instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no tickers to run")]
    NoTickers,
    #[error("start date {start} is after end date {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Current schema version for persisted run summaries.
pub const SCHEMA_VERSION: u32 = 1;

/// A ticker (or ticker-day) that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub ticker: String,
    pub date: Option<NaiveDate>,
    pub message: String,
}

/// How many ticker-days ended without a signal, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub insufficient_data: usize,
    pub gap_not_met: usize,
    pub no_qualifying_bar: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::InsufficientData { .. } => self.insufficient_data += 1,
            SkipReason::GapNotMet => self.gap_not_met += 1,
            SkipReason::NoQualifyingBar => self.no_qualifying_bar += 1,
        }
    }

    fn merge(&mut self, other: SkipCounts) {
        self.insufficient_data += other.insufficient_data;
        self.gap_not_met += other.gap_not_met;
        self.no_qualifying_bar += other.no_qualifying_bar;
    }

    pub fn total(&self) -> usize {
        self.insufficient_data + self.gap_not_met + self.no_qualifying_bar
    }
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: BacktestConfig,
    pub store: String,
    pub has_synthetic: bool,
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days_scanned: usize,
    pub skipped: SkipCounts,
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    pub errors: Vec<RunFailure>,
    pub data_quality_warnings: Vec<String>,
    pub metrics: MetricsReport,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Scan one ticker on one day and return the full debug payload.
///
/// Store failures are reported in `ScanOutcome::error`, never as "no signal".
pub fn scan_ticker_date(
    store: &dyn BarStore,
    ticker: &str,
    date: NaiveDate,
    config: &BacktestConfig,
) -> ScanOutcome {
    match store.load(ticker) {
        Ok(series) => scan_series_day(&series, date, config),
        Err(e) => {
            warn!(ticker, %date, error = %e, "bar store failed");
            ScanOutcome::failed(ticker, date, e.to_string())
        }
    }
}

/// Scan one day of an already loaded series.
pub fn scan_series_day(
    series: &BarSeries,
    date: NaiveDate,
    config: &BacktestConfig,
) -> ScanOutcome {
    let window = &config.session;
    scan(
        series.ticker(),
        date,
        series.session(date, window),
        series.prior_session_last_bar(date, window),
        &config.scanner,
        window,
    )
}

/// Per-ticker partial result, merged after the parallel phase.
#[derive(Default)]
struct TickerRun {
    days_scanned: usize,
    skipped: SkipCounts,
    signals: Vec<Signal>,
    trades: Vec<Trade>,
    errors: Vec<RunFailure>,
    warnings: Vec<String>,
}

fn run_ticker(
    store: &dyn BarStore,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    config: &BacktestConfig,
) -> TickerRun {
    let mut out = TickerRun::default();
    let series = match store.load(ticker) {
        Ok(series) => series,
        Err(e) => {
            warn!(ticker, error = %e, "bar store failed");
            out.errors.push(RunFailure {
                ticker: ticker.to_string(),
                date: None,
                message: e.to_string(),
            });
            return out;
        }
    };

    let window = &config.session;
    let dates = series
        .trading_dates(window)
        .into_iter()
        .filter(|d| *d >= start && *d <= end);

    for date in dates {
        let outcome = scan_series_day(&series, date, config);
        out.days_scanned += 1;
        out.warnings.extend(
            outcome
                .data_quality_warnings
                .iter()
                .map(|w| format!("{ticker} {date}: {w}")),
        );
        if let Some(reason) = &outcome.skip_reason {
            debug!(ticker, %date, ?reason, "day skipped");
            out.skipped.record(reason);
        }
        let Some(signal) = outcome.signal() else {
            continue;
        };
        match simulate(signal, series.session(date, window), &config.exits, window) {
            Some(trade) => {
                if trade.has_validation_errors() {
                    warn!(
                        ticker,
                        %date,
                        errors = ?trade.validation_errors,
                        "trade failed validation"
                    );
                }
                out.trades.push(trade);
            }
            None => {
                debug!(ticker, %date, "signal on last bar of session; recorded unfilled");
                out.trades.push(Trade::unfilled(signal));
            }
        }
        out.signals.push(signal.clone());
    }
    out
}

/// Run the scanner and simulator over `tickers` for every trading day in
/// `[start, end]`.
pub fn run_backtest(
    store: &dyn BarStore,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    config: &BacktestConfig,
) -> Result<RunResult, RunError> {
    config.validate()?;
    if tickers.is_empty() {
        return Err(RunError::NoTickers);
    }
    if start > end {
        return Err(RunError::EmptyRange { start, end });
    }
    let run_id = config.run_id()?;
    info!(
        run_id = %&run_id[..12],
        tickers = tickers.len(),
        %start,
        %end,
        store = store.name(),
        "starting backtest"
    );

    let partials: Vec<TickerRun> = tickers
        .par_iter()
        .map(|t| run_ticker(store, t, start, end, config))
        .collect();

    let mut merged = TickerRun::default();
    for p in partials {
        merged.days_scanned += p.days_scanned;
        merged.skipped.merge(p.skipped);
        merged.signals.extend(p.signals);
        merged.trades.extend(p.trades);
        merged.errors.extend(p.errors);
        merged.warnings.extend(p.warnings);
    }
    merged
        .signals
        .sort_by(|a, b| (a.date, &a.ticker).cmp(&(b.date, &b.ticker)));
    merged
        .trades
        .sort_by(|a, b| (a.date, &a.ticker).cmp(&(b.date, &b.ticker)));

    let metrics = MetricsReport::aggregate(&merged.trades);
    info!(
        days = merged.days_scanned,
        signals = merged.signals.len(),
        trades = metrics.trade_count,
        errors = merged.errors.len(),
        "backtest complete"
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        store: store.name().to_string(),
        has_synthetic: store.is_synthetic(),
        tickers: tickers.to_vec(),
        start,
        end,
        days_scanned: merged.days_scanned,
        skipped: merged.skipped,
        signals: merged.signals,
        trades: merged.trades,
        errors: merged.errors,
        data_quality_warnings: merged.warnings,
        metrics,
    })
}
