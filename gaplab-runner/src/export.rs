//! Run artifacts — JSON and CSV export.
//!
//! A backtest writes five files into its output directory:
//! - `trades.json` — trade records in the results-file format (`analyze` reads it back)
//! - `trades.csv` — the same trades as a flat table
//! - `signals.json` — every emitted signal
//! - `summary.json` — config, run id, counts, failures and the metrics report
//! - `report.md` — the rendered metrics report

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use gaplab_core::domain::{time_of_day, Trade};

use crate::config::BacktestConfig;
use crate::metrics::MetricsReport;
use crate::report::render_report;
use crate::runner::{RunFailure, RunResult, SkipCounts};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_trades_json(trades: &[Trade]) -> Result<String> {
    serde_json::to_string_pretty(trades).context("failed to serialize trades to JSON")
}

/// `RunResult` without the per-trade and per-signal lists.
#[derive(Serialize)]
struct RunSummary<'a> {
    schema_version: u32,
    run_id: &'a str,
    config: &'a BacktestConfig,
    store: &'a str,
    has_synthetic: bool,
    tickers: &'a [String],
    start: NaiveDate,
    end: NaiveDate,
    days_scanned: usize,
    signal_count: usize,
    skipped: SkipCounts,
    errors: &'a [RunFailure],
    data_quality_warnings: &'a [String],
    metrics: &'a MetricsReport,
}

pub fn export_summary_json(result: &RunResult) -> Result<String> {
    let summary = RunSummary {
        schema_version: result.schema_version,
        run_id: &result.run_id,
        config: &result.config,
        store: &result.store,
        has_synthetic: result.has_synthetic,
        tickers: &result.tickers,
        start: result.start,
        end: result.end,
        days_scanned: result.days_scanned,
        signal_count: result.signals.len(),
        skipped: result.skipped,
        errors: &result.errors,
        data_quality_warnings: &result.data_quality_warnings,
        metrics: &result.metrics,
    };
    serde_json::to_string_pretty(&summary).context("failed to serialize run summary to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt_f64(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}")).unwrap_or_default()
}

/// Export trades as CSV, one row per record. Missing values are empty cells;
/// validation errors are joined with `"; "`.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "ticker",
        "date",
        "side",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "exit_reason",
        "pnl_percent",
        "lowest_price",
        "highest_price",
        "gap_percent",
        "pattern_strength",
        "validation_errors",
    ])?;

    for t in trades {
        wtr.write_record([
            t.ticker.clone(),
            t.date.to_string(),
            t.side.to_string(),
            t.entry_time.as_ref().map(time_of_day::format).unwrap_or_default(),
            format!("{:.4}", t.entry_price),
            t.exit_time.as_ref().map(time_of_day::format).unwrap_or_default(),
            opt_f64(t.exit_price, 4),
            t.exit_reason.map(|r| r.to_string()).unwrap_or_default(),
            opt_f64(t.pnl_percent, 4),
            format!("{:.4}", t.lowest_price),
            format!("{:.4}", t.highest_price),
            opt_f64(t.gap_percent, 4),
            opt_f64(t.pattern_strength, 2),
            t.validation_errors.join("; "),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the run artifacts into `output_dir`, creating it if needed.
pub fn save_run_artifacts(result: &RunResult, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = output_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    write("trades.json", export_trades_json(&result.trades)?)?;
    write("trades.csv", export_trades_csv(&result.trades)?)?;
    write(
        "signals.json",
        serde_json::to_string_pretty(&result.signals).context("failed to serialize signals")?,
    )?;
    write("summary.json", export_summary_json(result)?)?;
    let short_id = result.run_id.get(..12).unwrap_or(&result.run_id);
    write(
        "report.md",
        render_report(&format!("GapLab Run {short_id}"), &result.metrics),
    )?;
    Ok(())
}
