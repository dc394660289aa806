//! Running session statistics folded bar by bar.
//!
//! Both accumulators are strictly sequential: they are fed one session in
//! timestamp order and discarded at the end of the day.

pub mod volume;
pub mod vwap;

pub use volume::RunningVolume;
pub use vwap::{vwap_series, VwapState, VwapTracker};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
