//! Gap + VWAP-reclaim signal scanner.
//!
//! One `DayScanner` walks one day session:
//!
//! ```text
//! AwaitingGap ──gap meets threshold──▶ Scanning ──qualifying bar──▶ Signaled
//!      │                                  │
//!      └─ insufficient data / gap not met └─ bars exhausted ──────▶ Exhausted
//! ```
//!
//! While scanning, each bar is folded into the session VWAP and classified as
//! ABOVE (`close > vwap`) or BELOW. Every change of classification is a cross.
//! The entry fires on the first bar where the classification has just moved
//! from the gap's "fail" side back to its "reclaim" side, the cumulative cross
//! count (including this one) reaches `min_vwap_crosses`, and the bar's volume
//! is at least `min_volume_ratio` times the mean volume of the bars before it.
//! At most one signal is emitted per ticker and day.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::domain::{time_of_day, Bar, Signal};
use crate::gap::{classify_gap, GapDirection, GapResult, DEFAULT_MIN_GAP_PERCENT};
use crate::indicators::{RunningVolume, VwapTracker};
use crate::quality::{bar_label, session_warnings};
use crate::session::SessionWindow;

pub const DEFAULT_MIN_VWAP_CROSSES: u32 = 1;
pub const DEFAULT_MIN_VOLUME_RATIO: f64 = 1.2;

/// Number of leading session bars echoed back in `ScanOutcome::sample_bars`.
pub const SAMPLE_BAR_COUNT: usize = 15;

/// Scanner thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub direction: GapDirection,
    pub min_gap_percent: f64,
    pub min_vwap_crosses: u32,
    pub min_volume_ratio: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            direction: GapDirection::Down,
            min_gap_percent: DEFAULT_MIN_GAP_PERCENT,
            min_vwap_crosses: DEFAULT_MIN_VWAP_CROSSES,
            min_volume_ratio: DEFAULT_MIN_VOLUME_RATIO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    AwaitingGap,
    Scanning,
    Signaled,
    Exhausted,
}

/// Close relative to session VWAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VwapSide {
    Above,
    Below,
}

impl VwapSide {
    pub fn classify(close: f64, vwap: f64) -> Self {
        if close > vwap {
            VwapSide::Above
        } else {
            VwapSide::Below
        }
    }
}

impl fmt::Display for VwapSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VwapSide::Above => write!(f, "ABOVE"),
            VwapSide::Below => write!(f, "BELOW"),
        }
    }
}

/// `(fail side, reclaim side)` for a gap direction.
pub fn reclaim_transition(direction: GapDirection) -> (VwapSide, VwapSide) {
    match direction {
        GapDirection::Down => (VwapSide::Below, VwapSide::Above),
        GapDirection::Up => (VwapSide::Above, VwapSide::Below),
    }
}

/// Why a day ended without a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientData { detail: String },
    GapNotMet,
    NoQualifyingBar,
}

/// A leading session bar with its running VWAP, for debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBar {
    #[serde(with = "time_of_day")]
    pub time_of_day: NaiveTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub vwap: Option<f64>,
}

/// Result of scanning one ticker on one day.
///
/// `error` is reserved for failures outside the scan itself (the bar source
/// could not be read); a day skipped for lack of data reports `skip_reason`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub ticker: String,
    pub date: NaiveDate,
    pub bars_scanned: usize,
    pub signals_found: usize,
    pub signals: Vec<Signal>,
    pub gap: Option<GapResult>,
    pub final_state: ScanState,
    pub skip_reason: Option<SkipReason>,
    pub sample_bars: Vec<SampleBar>,
    pub debug_logs: Vec<String>,
    pub data_quality_warnings: Vec<String>,
    pub error: Option<String>,
}

impl ScanOutcome {
    /// An outcome for a day that could not be scanned at all.
    pub fn failed(ticker: &str, date: NaiveDate, error: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            date,
            bars_scanned: 0,
            signals_found: 0,
            signals: Vec::new(),
            gap: None,
            final_state: ScanState::Exhausted,
            skip_reason: None,
            sample_bars: Vec::new(),
            debug_logs: Vec::new(),
            data_quality_warnings: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn signal(&self) -> Option<&Signal> {
        self.signals.first()
    }
}

/// Composite signal score in `[0, 100]`.
///
/// `40 * min(|gap| / 5, 1) + 20 * min(crosses / 3, 1) + 40 * clamp((ratio - 1) / 4, 0, 1)`,
/// rounded to two decimals. Non-decreasing in gap magnitude, cross count and
/// volume ratio.
pub fn pattern_strength(gap_percent: f64, vwap_crosses: u32, volume_ratio: f64) -> f64 {
    let gap = (gap_percent.abs() / 5.0).min(1.0);
    let crosses = (f64::from(vwap_crosses) / 3.0).min(1.0);
    let volume = ((volume_ratio - 1.0) / 4.0).clamp(0.0, 1.0);
    let score = 40.0 * gap + 20.0 * crosses + 40.0 * volume;
    (score * 100.0).round() / 100.0
}

/// Stateful scan over one day session.
pub struct DayScanner<'a> {
    ticker: &'a str,
    date: NaiveDate,
    config: &'a ScannerConfig,
    window: &'a SessionWindow,
    state: ScanState,
    gap: Option<GapResult>,
    vwap: VwapTracker,
    volume: RunningVolume,
    last_side: Option<VwapSide>,
    crosses: u32,
    bars_scanned: usize,
    signal: Option<Signal>,
    skip_reason: Option<SkipReason>,
    logs: Vec<String>,
}

impl<'a> DayScanner<'a> {
    pub fn new(
        ticker: &'a str,
        date: NaiveDate,
        config: &'a ScannerConfig,
        window: &'a SessionWindow,
    ) -> Self {
        Self {
            ticker,
            date,
            config,
            window,
            state: ScanState::AwaitingGap,
            gap: None,
            vwap: VwapTracker::new(),
            volume: RunningVolume::new(),
            last_side: None,
            crosses: 0,
            bars_scanned: 0,
            signal: None,
            skip_reason: None,
            logs: Vec::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn crosses(&self) -> u32 {
        self.crosses
    }

    /// Leaves `AwaitingGap`: classify the gap and decide whether to scan.
    pub fn begin(&mut self, bars: &[Bar], prior_session_last: Option<&Bar>) -> ScanState {
        if self.state != ScanState::AwaitingGap {
            return self.state;
        }
        let gap = match classify_gap(
            prior_session_last,
            bars.first(),
            self.config.direction,
            self.config.min_gap_percent,
        ) {
            Ok(gap) => gap,
            Err(err) => {
                return self.exhaust(SkipReason::InsufficientData {
                    detail: err.to_string(),
                })
            }
        };
        self.gap = Some(gap);
        self.log(format!(
            "gap {:+.2}% ({}) from prior close {:.4} to open {:.4}; need {} >= {:.2}%",
            gap.gap_percent,
            gap.direction,
            gap.previous_close,
            gap.session_open,
            self.config.direction,
            self.config.min_gap_percent
        ));
        if !gap.meets_threshold {
            return self.exhaust(SkipReason::GapNotMet);
        }
        if bars.len() < 2 {
            return self.exhaust(SkipReason::InsufficientData {
                detail: format!("{} bar(s) in session, at least 2 needed", bars.len()),
            });
        }
        self.state = ScanState::Scanning;
        self.state
    }

    /// Folds one bar while `Scanning`; a no-op in any other state.
    pub fn on_bar(&mut self, bar: &Bar) -> ScanState {
        if self.state != ScanState::Scanning {
            return self.state;
        }
        self.bars_scanned += 1;

        let volume_ratio = self.volume.ratio(bar.volume);
        self.volume.push(bar.volume);

        let Some(vwap) = self.vwap.observe(bar) else {
            return self.state;
        };
        let side = VwapSide::classify(bar.close, vwap);
        let Some(previous) = self.last_side.replace(side) else {
            return self.state;
        };
        if previous == side {
            return self.state;
        }

        self.crosses += 1;
        let label = bar_label(bar, self.window);
        self.log(format!(
            "cross #{} at {label}: {previous} -> {side} (close {:.4}, vwap {:.4})",
            self.crosses, bar.close, vwap
        ));

        if (previous, side) != reclaim_transition(self.config.direction) {
            return self.state;
        }
        if self.crosses < self.config.min_vwap_crosses {
            self.log(format!(
                "reclaim at {label} rejected: {} crosses, need {}",
                self.crosses, self.config.min_vwap_crosses
            ));
            return self.state;
        }
        let Some(ratio) = volume_ratio.filter(|r| *r >= self.config.min_volume_ratio) else {
            self.log(format!(
                "reclaim at {label} rejected: volume ratio {} below {:.2}",
                volume_ratio.map_or_else(|| "undefined".to_string(), |r| format!("{r:.2}")),
                self.config.min_volume_ratio
            ));
            return self.state;
        };

        let gap_percent = self.gap.map_or(0.0, |g| g.gap_percent);
        let signal = Signal {
            ticker: self.ticker.to_string(),
            date: self.date,
            signal_time: self.window.time_of_day(bar.timestamp).unwrap_or_default(),
            timestamp: bar.timestamp,
            entry_price: bar.close,
            gap_percent,
            vwap_crosses: self.crosses,
            volume_ratio: ratio,
            pattern_strength: pattern_strength(gap_percent, self.crosses, ratio),
            side: self.config.direction.setup_side(),
        };
        self.log(format!(
            "signal at {label}: close {:.4}, {} crosses, volume ratio {:.2}, strength {:.2}",
            signal.entry_price, signal.vwap_crosses, signal.volume_ratio, signal.pattern_strength
        ));
        self.signal = Some(signal);
        self.state = ScanState::Signaled;
        self.state
    }

    /// Closes the day. A scanner still `Scanning` becomes `Exhausted`.
    pub fn finish(mut self) -> ScanOutcome {
        match self.state {
            ScanState::Scanning => {
                self.log(format!(
                    "no qualifying bar in {} bars ({} crosses)",
                    self.bars_scanned, self.crosses
                ));
                self.exhaust(SkipReason::NoQualifyingBar);
            }
            ScanState::AwaitingGap => {
                self.exhaust(SkipReason::InsufficientData {
                    detail: "scan never started".to_string(),
                });
            }
            ScanState::Signaled | ScanState::Exhausted => {}
        }
        let signals: Vec<Signal> = self.signal.into_iter().collect();
        ScanOutcome {
            ticker: self.ticker.to_string(),
            date: self.date,
            bars_scanned: self.bars_scanned,
            signals_found: signals.len(),
            signals,
            gap: self.gap,
            final_state: self.state,
            skip_reason: self.skip_reason,
            sample_bars: Vec::new(),
            debug_logs: self.logs,
            data_quality_warnings: Vec::new(),
            error: None,
        }
    }

    fn exhaust(&mut self, reason: SkipReason) -> ScanState {
        if let SkipReason::InsufficientData { detail } = &reason {
            self.log(format!("insufficient data: {detail}"));
        }
        self.skip_reason = Some(reason);
        self.state = ScanState::Exhausted;
        self.state
    }

    fn log(&mut self, message: String) {
        debug!(ticker = self.ticker, date = %self.date, "{message}");
        self.logs.push(message);
    }
}

/// Scan one day session for a gap + VWAP-reclaim entry.
///
/// `bars` must be the ordered session bars for `date`; `prior_session_last`
/// the last bar of the previous trading session.
pub fn scan(
    ticker: &str,
    date: NaiveDate,
    bars: &[Bar],
    prior_session_last: Option<&Bar>,
    config: &ScannerConfig,
    window: &SessionWindow,
) -> ScanOutcome {
    let mut scanner = DayScanner::new(ticker, date, config, window);
    scanner.begin(bars, prior_session_last);
    for bar in bars {
        if scanner.on_bar(bar) != ScanState::Scanning {
            break;
        }
    }

    let mut outcome = scanner.finish();
    outcome.sample_bars = sample_bars(bars, window, SAMPLE_BAR_COUNT);
    outcome.data_quality_warnings = session_warnings(bars, window);
    if prior_session_last.is_none() {
        outcome
            .data_quality_warnings
            .push("no prior-session bar; gap cannot be computed".to_string());
    }
    outcome
}

/// The first `n` bars with their running VWAP.
pub fn sample_bars(bars: &[Bar], window: &SessionWindow, n: usize) -> Vec<SampleBar> {
    let mut vwap = VwapTracker::new();
    bars.iter()
        .take(n)
        .map(|b| SampleBar {
            time_of_day: window.time_of_day(b.timestamp).unwrap_or_default(),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
            vwap: vwap.observe(b),
        })
        .collect()
}
