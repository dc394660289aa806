//! Trade simulator: one position per signal, filled bar by bar.
//!
//! Entry is the open of the first bar after the signal bar. Each bar from the
//! entry bar on is checked for exits in a fixed priority:
//!
//! 1. stop-loss (adverse level touched)
//! 2. target (favorable level touched)
//! 3. time exit (holding time reached, at the bar close)
//! 4. end of data (last bar close)
//!
//! When one bar touches both stop and target the stop wins; intrabar order is
//! unknowable from OHLC and the pessimistic reading is used.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{Bar, ExitReason, PositionSide, Signal, Trade};
use crate::session::SessionWindow;

pub const DEFAULT_STOP_LOSS_PCT: f64 = 2.0;
pub const DEFAULT_TARGET_PCT: f64 = 4.0;

/// Fill price for a triggered stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopFill {
    /// The bar's adverse extreme (long: low, short: high).
    #[default]
    WorstCase,
    /// The stop level, or the open when the bar opened through it.
    StopLevel,
}

/// Exit thresholds, in percent of the entry price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    pub stop_loss_pct: f64,
    pub target_pct: f64,
    /// Maximum holding time; `None` disables the time exit.
    pub max_hold_minutes: Option<u32>,
    pub stop_fill: StopFill,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            target_pct: DEFAULT_TARGET_PCT,
            max_hold_minutes: None,
            stop_fill: StopFill::WorstCase,
        }
    }
}

/// Stop fill for a bar that touched `level`, or `None` when it did not.
fn stop_fill(side: PositionSide, level: f64, bar: &Bar, policy: StopFill) -> Option<f64> {
    let (touched, gapped_through, extreme) = match side {
        PositionSide::Long => (bar.low <= level, bar.open <= level, bar.low),
        PositionSide::Short => (bar.high >= level, bar.open >= level, bar.high),
    };
    if !touched {
        return None;
    }
    Some(match policy {
        StopFill::WorstCase => extreme,
        StopFill::StopLevel if gapped_through => bar.open,
        StopFill::StopLevel => level,
    })
}

/// Target fill for a bar that touched `level`. A bar opening beyond the
/// target fills at the open.
fn target_fill(side: PositionSide, level: f64, bar: &Bar) -> Option<f64> {
    let (touched, gapped_through) = match side {
        PositionSide::Long => (bar.high >= level, bar.open >= level),
        PositionSide::Short => (bar.low <= level, bar.open <= level),
    };
    touched.then(|| if gapped_through { bar.open } else { level })
}

/// Simulate the trade opened by `signal`.
///
/// `bars` is the day session; bars at or before the signal bar are skipped.
/// Returns `None` when there is no bar to enter on or the entry open is not
/// a positive price.
pub fn simulate(
    signal: &Signal,
    bars: &[Bar],
    rules: &ExitRules,
    window: &SessionWindow,
) -> Option<Trade> {
    let after = &bars[bars.partition_point(|b| b.timestamp <= signal.timestamp)..];
    let entry_bar = after.first()?;
    let entry_price = entry_bar.open;
    if entry_price.is_nan() || entry_price <= 0.0 {
        return None;
    }

    let side = signal.side;
    let stop_level = side.adverse_level(entry_price, rules.stop_loss_pct);
    let target_level = side.favorable_level(entry_price, rules.target_pct);
    let max_hold_ms = rules.max_hold_minutes.map(|m| i64::from(m) * 60_000);

    let mut lowest = f64::INFINITY;
    let mut highest = f64::NEG_INFINITY;
    let mut exit: Option<(&Bar, f64, ExitReason)> = None;

    for bar in after {
        lowest = lowest.min(bar.low);
        highest = highest.max(bar.high);

        if let Some(price) = stop_fill(side, stop_level, bar, rules.stop_fill) {
            exit = Some((bar, price, ExitReason::StopLoss));
            break;
        }
        if let Some(price) = target_fill(side, target_level, bar) {
            exit = Some((bar, price, ExitReason::Target));
            break;
        }
        if max_hold_ms.is_some_and(|max| bar.timestamp - entry_bar.timestamp >= max) {
            exit = Some((bar, bar.close, ExitReason::TimeExit));
            break;
        }
    }

    let (exit_bar, exit_price, reason) = match exit {
        Some(exit) => exit,
        None => {
            let last = after.last()?;
            (last, last.close, ExitReason::EndOfData)
        }
    };

    let pnl = side.pnl_percent(entry_price, exit_price);
    trace!(
        ticker = %signal.ticker,
        date = %signal.date,
        entry = entry_price,
        exit = exit_price,
        reason = %reason,
        pnl,
        "trade closed"
    );

    let mut trade = Trade {
        ticker: signal.ticker.clone(),
        date: signal.date,
        side,
        entry_time: window.time_of_day(entry_bar.timestamp),
        entry_price,
        exit_time: window.time_of_day(exit_bar.timestamp),
        exit_price: Some(exit_price),
        exit_reason: Some(reason),
        pnl_percent: Some(pnl),
        lowest_price: lowest,
        highest_price: highest,
        validation_errors: Vec::new(),
        gap_percent: Some(signal.gap_percent),
        pattern_strength: Some(signal.pattern_strength),
    };
    trade.validate_price_bounds();
    Some(trade)
}
