//! GapLab Runner — bar stores, backtest orchestration, metrics, reports.
//!
//! This crate builds on `gaplab-core` to provide:
//! - TOML configuration with content-addressed run ids
//! - Bar stores (CSV directory, synthetic sessions, in-memory fixtures)
//! - Per-day debug scans and parallel multi-ticker backtests
//! - Metrics aggregation with exit-reason and entry-time breakdowns
//! - Trade-result file I/O, run artifacts, gap screening, strategy comparison

pub mod compare;
pub mod config;
pub mod export;
pub mod gap_screen;
pub mod metrics;
pub mod report;
pub mod results_file;
pub mod runner;
pub mod store;

pub use compare::{compare, CompareError, NamedResultsFile, StrategyComparison};
pub use config::{BacktestConfig, ConfigError, DataConfig, RunId};
pub use export::{export_trades_csv, export_trades_json, save_run_artifacts};
pub use gap_screen::{screen_gaps, GapRow, GapScreen, TickerCoverage};
pub use metrics::{GroupStats, MetricsReport, TimeBucket};
pub use report::{render_comparison, render_report};
pub use results_file::{parse_trades, read_trades, ResultsFileError};
pub use runner::{run_backtest, scan_ticker_date, RunError, RunFailure, RunResult, SkipCounts};
pub use store::{BarStore, CsvBarStore, InMemoryBarStore, StoreError, SyntheticBarStore};
