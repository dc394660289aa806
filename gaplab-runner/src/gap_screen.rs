//! Gap screen: data coverage per ticker and the largest session gaps.
//!
//! A quick look at a bar store before a backtest: how many sessions each
//! ticker has, and which days opened furthest from the prior close.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gaplab_core::domain::BarSeries;
use gaplab_core::gap::gap_percent;
use gaplab_core::session::SessionWindow;

use crate::runner::RunFailure;
use crate::store::BarStore;

/// Default minimum |gap| for a row to be listed, in percent.
pub const DEFAULT_MIN_ABS_GAP: f64 = 0.5;
/// Default number of rows kept after sorting.
pub const DEFAULT_LIMIT: usize = 20;

/// One session open compared with the previous session's last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub previous_close: f64,
    pub session_open: f64,
    pub gap_percent: f64,
}

/// Session coverage for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerCoverage {
    pub ticker: String,
    pub sessions: usize,
    pub bars: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapScreen {
    pub coverage: Vec<TickerCoverage>,
    /// Sorted by |gap| descending, at most `limit` rows.
    pub rows: Vec<GapRow>,
    pub errors: Vec<RunFailure>,
}

pub fn coverage(series: &BarSeries, window: &SessionWindow) -> TickerCoverage {
    let dates = series.trading_dates(window);
    let bars = dates.iter().map(|d| series.session(*d, window).len()).sum();
    TickerCoverage {
        ticker: series.ticker().to_string(),
        sessions: dates.len(),
        bars,
        first_date: dates.first().copied(),
        last_date: dates.last().copied(),
    }
}

/// Every session gap in `[start, end]` that has a prior session to compare to.
pub fn session_gaps(
    series: &BarSeries,
    start: NaiveDate,
    end: NaiveDate,
    window: &SessionWindow,
) -> Vec<GapRow> {
    series
        .trading_dates(window)
        .into_iter()
        .filter(|d| *d >= start && *d <= end)
        .filter_map(|date| {
            let first = series.session(date, window).first()?;
            let prior = series.prior_session_last_bar(date, window)?;
            if prior.close.is_nan() || prior.close <= 0.0 {
                return None;
            }
            Some(GapRow {
                ticker: series.ticker().to_string(),
                date,
                previous_close: prior.close,
                session_open: first.open,
                gap_percent: gap_percent(prior.close, first.open),
            })
        })
        .collect()
}

/// Screen `tickers` for gaps with `|gap| > min_abs_gap`, largest first.
///
/// Tickers the store cannot load are listed in `errors` and skipped.
pub fn screen_gaps(
    store: &dyn BarStore,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    window: &SessionWindow,
    min_abs_gap: f64,
    limit: usize,
) -> GapScreen {
    let per_ticker: Vec<Result<(TickerCoverage, Vec<GapRow>), RunFailure>> = tickers
        .par_iter()
        .map(|ticker| {
            let series = store.load(ticker).map_err(|e| {
                warn!(ticker = %ticker, error = %e, "bar store failed");
                RunFailure {
                    ticker: ticker.clone(),
                    date: None,
                    message: e.to_string(),
                }
            })?;
            let gaps = session_gaps(&series, start, end, window);
            debug!(ticker = %ticker, sessions = gaps.len(), "screened");
            Ok((coverage(&series, window), gaps))
        })
        .collect();

    let mut screen = GapScreen::default();
    for item in per_ticker {
        match item {
            Ok((cov, gaps)) => {
                screen.coverage.push(cov);
                screen
                    .rows
                    .extend(gaps.into_iter().filter(|g| g.gap_percent.abs() > min_abs_gap));
            }
            Err(failure) => screen.errors.push(failure),
        }
    }

    screen.rows.sort_by(|a, b| {
        b.gap_percent
            .abs()
            .total_cmp(&a.gap_percent.abs())
            .then_with(|| (a.date, &a.ticker).cmp(&(b.date, &b.ticker)))
    });
    screen.rows.truncate(limit);
    screen
}
