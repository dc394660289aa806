//! Trade — one simulated (or persisted) round trip with exit attribution.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::position::PositionSide;
use super::signal::Signal;
use super::time_of_day;

/// Why a trade was closed.
///
/// Persisted result files from other gap strategies may carry reasons this
/// simulator never produces; those collapse into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    Target,
    TimeExit,
    EndOfData,
    #[serde(other)]
    Other,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Target => "target",
            ExitReason::TimeExit => "time_exit",
            ExitReason::EndOfData => "end_of_data",
            ExitReason::Other => "other",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trade record in the shape the backtest result files use (camelCase).
///
/// `pnl_percent` is `None` for signals that never produced a closed trade.
/// Price-bound violations are recorded in `validation_errors` instead of
/// rejecting the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub ticker: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub side: PositionSide,

    // ── Entry ──
    #[serde(default, with = "time_of_day::option")]
    pub entry_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entry_price: f64,

    // ── Exit ──
    #[serde(default, with = "time_of_day::option")]
    pub exit_time: Option<NaiveTime>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub exit_reason: Option<ExitReason>,
    #[serde(default)]
    pub pnl_percent: Option<f64>,

    // ── Excursion ──
    #[serde(default, deserialize_with = "null_as_default")]
    pub lowest_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub highest_price: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub validation_errors: Vec<String>,

    // ── Signal traceability ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_strength: Option<f64>,
}

impl Trade {
    /// Record for a signal that never got an entry fill, e.g. one on the last
    /// bar of the session. Priced at the signal close with no exit and no pnl.
    pub fn unfilled(signal: &Signal) -> Self {
        Self {
            ticker: signal.ticker.clone(),
            date: signal.date,
            side: signal.side,
            entry_time: None,
            entry_price: signal.entry_price,
            exit_time: None,
            exit_price: None,
            exit_reason: None,
            pnl_percent: None,
            lowest_price: signal.entry_price,
            highest_price: signal.entry_price,
            validation_errors: Vec::new(),
            gap_percent: Some(signal.gap_percent),
            pattern_strength: Some(signal.pattern_strength),
        }
    }

    /// True when the trade has a realized pnl.
    pub fn is_closed(&self) -> bool {
        self.pnl_percent.is_some()
    }

    pub fn is_winner(&self) -> bool {
        self.pnl_percent.is_some_and(|p| p > 0.0)
    }

    pub fn is_loser(&self) -> bool {
        self.pnl_percent.is_some_and(|p| p < 0.0)
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    /// Checks `lowest <= min(entry, exit)` and `highest >= max(entry, exit)`,
    /// appending a message per violation.
    pub fn validate_price_bounds(&mut self) {
        let Some(exit_price) = self.exit_price else {
            return;
        };
        let floor = self.entry_price.min(exit_price);
        let ceiling = self.entry_price.max(exit_price);
        if self.lowest_price > floor {
            self.validation_errors.push(format!(
                "lowestPrice {:.4} is above min(entryPrice, exitPrice) {:.4}",
                self.lowest_price, floor
            ));
        }
        if self.highest_price < ceiling {
            self.validation_errors.push(format!(
                "highestPrice {:.4} is below max(entryPrice, exitPrice) {:.4}",
                self.highest_price, ceiling
            ));
        }
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
