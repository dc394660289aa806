//! Volume-weighted average price over a session.
//!
//! Typical price is (high + low + close) / 3. VWAP is the cumulative
//! typical-price-times-volume divided by cumulative volume and is undefined
//! until some volume has been observed. One tracker per session. The running
//! value depends on feed order, so callers pass bars in timestamp order.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Running sums behind a VWAP value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VwapState {
    pub cumulative_volume: f64,
    pub cumulative_typical_price_volume: f64,
}

impl VwapState {
    pub fn vwap(&self) -> Option<f64> {
        (self.cumulative_volume > 0.0)
            .then(|| self.cumulative_typical_price_volume / self.cumulative_volume)
    }
}

/// Incremental VWAP accumulator.
#[derive(Debug, Clone, Default)]
pub struct VwapTracker {
    state: VwapState,
    observed: usize,
}

impl VwapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one bar and return the VWAP over everything observed so far.
    pub fn observe(&mut self, bar: &Bar) -> Option<f64> {
        let volume = bar.volume as f64;
        self.state.cumulative_volume += volume;
        self.state.cumulative_typical_price_volume += bar.typical_price() * volume;
        self.observed += 1;
        self.state.vwap()
    }

    /// Fold a batch of bars in order; equivalent to calling `observe` on each.
    pub fn observe_all<'a, I>(&mut self, bars: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a Bar>,
    {
        for bar in bars {
            self.observe(bar);
        }
        self.vwap()
    }

    pub fn vwap(&self) -> Option<f64> {
        self.state.vwap()
    }

    pub fn state(&self) -> VwapState {
        self.state
    }

    pub fn bars_observed(&self) -> usize {
        self.observed
    }
}

/// Session VWAP at every bar (inclusive). NaN where undefined.
pub fn vwap_series(bars: &[Bar]) -> Vec<f64> {
    let mut tracker = VwapTracker::new();
    bars.iter()
        .map(|b| tracker.observe(b).unwrap_or(f64::NAN))
        .collect()
}
