//! Seeded random-walk intraday sessions.
//!
//! Used by the benchmark, the CLI's `--synthetic` mode and tests. The same
//! seed always produces the same series.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarError, BarSeries};
use crate::session::SessionWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub start_price: f64,
    pub interval_minutes: u32,
    /// Largest overnight gap, in percent of the prior close.
    pub max_gap_percent: f64,
    /// Largest single-bar move, in percent.
    pub bar_volatility_percent: f64,
    pub base_volume: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_price: 100.0,
            interval_minutes: 5,
            max_gap_percent: 3.0,
            bar_volatility_percent: 0.4,
            base_volume: 10_000,
        }
    }
}

const MIN_PRICE: f64 = 0.01;

/// Weekday sessions from `start` to `end` inclusive.
pub fn generate_sessions(
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    window: &SessionWindow,
    config: &SyntheticConfig,
) -> Result<BarSeries, BarError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let step_ms = i64::from(config.interval_minutes.max(1)) * 60_000;
    let mut close = config.start_price.max(MIN_PRICE);
    let mut bars = Vec::new();

    let mut date = start;
    while date <= end {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        if let (false, Some((open_ms, close_ms))) = (weekend, window.bounds(date)) {
            let gap = rng.gen_range(-config.max_gap_percent..=config.max_gap_percent);
            let mut open = (close * (1.0 + gap / 100.0)).max(MIN_PRICE);
            let mut ts = open_ms;
            while ts < close_ms {
                let bar = random_bar(&mut rng, ts, open, config);
                close = bar.close;
                open = bar.close;
                bars.push(bar);
                ts += step_ms;
            }
        }
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }

    BarSeries::new(ticker, bars)
}

fn random_bar(rng: &mut StdRng, timestamp: i64, open: f64, config: &SyntheticConfig) -> Bar {
    let vol = config.bar_volatility_percent.abs();
    let ret = rng.gen_range(-vol..=vol);
    let close = (open * (1.0 + ret / 100.0)).max(MIN_PRICE);
    let wick_up = rng.gen_range(0.0..=vol / 2.0);
    let wick_down = rng.gen_range(0.0..=vol / 2.0);
    let high = open.max(close) * (1.0 + wick_up / 100.0);
    let low = (open.min(close) * (1.0 - wick_down / 100.0)).max(MIN_PRICE);
    let volume = (config.base_volume as f64 * rng.gen_range(0.3..=3.0)).round() as u64;
    Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn same_seed_same_series() {
        let w = SessionWindow::default();
        let cfg = SyntheticConfig::default();
        let a = generate_sessions("SYN", d(2025, 11, 10), d(2025, 11, 14), &w, &cfg).unwrap();
        let b = generate_sessions("SYN", d(2025, 11, 10), d(2025, 11, 14), &w, &cfg).unwrap();
        assert_eq!(a, b);

        let other = SyntheticConfig {
            seed: 7,
            ..cfg
        };
        let c = generate_sessions("SYN", d(2025, 11, 10), d(2025, 11, 14), &w, &other).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn skips_weekends_and_fills_sessions() {
        let w = SessionWindow::default();
        let series = generate_sessions(
            "SYN",
            d(2025, 11, 14),
            d(2025, 11, 17),
            &w,
            &SyntheticConfig::default(),
        )
        .unwrap();
        assert_eq!(series.trading_dates(&w), vec![d(2025, 11, 14), d(2025, 11, 17)]);
        // 09:30..16:00 in 5-minute steps
        assert_eq!(series.session(d(2025, 11, 14), &w).len(), 78);
    }

    #[test]
    fn bars_are_sane() {
        let w = SessionWindow::default();
        let series = generate_sessions(
            "SYN",
            d(2025, 11, 10),
            d(2025, 11, 21),
            &w,
            &SyntheticConfig::default(),
        )
        .unwrap();
        assert!(series.bars().iter().all(Bar::is_sane));
    }
}
