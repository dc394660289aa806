//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for one ticker at a fixed intraday timeframe.
///
/// `timestamp` is the bar open time in epoch milliseconds (UTC). Bars are
/// immutable once read; the scanner and simulator only ever borrow them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: `low <= min(open, close) <= max(open, close) <= high`
    /// with strictly positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }

    /// Typical price: (high + low + close) / 3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Bar open time as a UTC datetime. `None` for out-of-range timestamps.
    pub fn datetime_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Errors raised while assembling a bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error(
        "bar timestamps for '{ticker}' are not strictly increasing at index {index} ({previous} -> {current})"
    )]
    NonMonotonic {
        ticker: String,
        index: usize,
        previous: i64,
        current: i64,
    },
}

/// Ordered intraday bars for one ticker at one timeframe.
///
/// The constructor enforces strictly increasing timestamps; every consumer
/// downstream (VWAP, scanner, simulator) relies on that ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    ticker: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self, BarError> {
        let ticker = ticker.into();
        if let Some(index) = bars.windows(2).position(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(BarError::NonMonotonic {
                ticker,
                index: index + 1,
                previous: bars[index].timestamp,
                current: bars[index + 1].timestamp,
            });
        }
        Ok(Self { ticker, bars })
    }

    /// Builds a series from bars in arbitrary order, sorting by timestamp.
    ///
    /// Duplicate timestamps are still rejected.
    pub fn from_unsorted(ticker: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, BarError> {
        bars.sort_by_key(|b| b.timestamp);
        Self::new(ticker, bars)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: 1_731_594_600_000,
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_open_below_low() {
        let mut bar = sample_bar();
        bar.open = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        assert!((bar.typical_price() - (105.0 + 98.0 + 103.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn series_rejects_duplicate_timestamp() {
        let a = sample_bar();
        let b = sample_bar();
        let err = BarSeries::new("SPY", vec![a, b]).unwrap_err();
        assert_eq!(
            err,
            BarError::NonMonotonic {
                ticker: "SPY".into(),
                index: 1,
                previous: a.timestamp,
                current: b.timestamp,
            }
        );
    }

    #[test]
    fn series_sorts_unsorted_input() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.timestamp -= 300_000;
        let series = BarSeries::from_unsorted("SPY", vec![a, b]).unwrap();
        assert_eq!(series.bars()[0].timestamp, b.timestamp);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
