//! Gap classifier: session open versus previous session close.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{Bar, PositionSide};

pub const DEFAULT_MIN_GAP_PERCENT: f64 = 1.0;

/// Which way the session opened relative to the prior close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapDirection {
    Up,
    #[default]
    Down,
}

impl GapDirection {
    /// Side of the reclaim trade for a gap in this direction: a gap down is
    /// bought back above VWAP, a gap up is faded below it.
    pub fn setup_side(self) -> PositionSide {
        match self {
            GapDirection::Down => PositionSide::Long,
            GapDirection::Up => PositionSide::Short,
        }
    }
}

impl fmt::Display for GapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapDirection::Up => write!(f, "up"),
            GapDirection::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapResult {
    pub previous_close: f64,
    pub session_open: f64,
    pub gap_percent: f64,
    pub direction: GapDirection,
    pub meets_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GapError {
    #[error("insufficient data: {0}")]
    InsufficientData(&'static str),
}

/// `(session_open - previous_close) / previous_close * 100`.
pub fn gap_percent(previous_close: f64, session_open: f64) -> f64 {
    (session_open - previous_close) / previous_close * 100.0
}

/// Classify the gap between the prior session's last bar and this session's
/// first bar against a target direction and minimum magnitude.
///
/// A zero gap is reported as `Up` and only meets a zero threshold.
pub fn classify_gap(
    prior_session_last: Option<&Bar>,
    session_first: Option<&Bar>,
    target: GapDirection,
    min_gap_percent: f64,
) -> Result<GapResult, GapError> {
    let prior = prior_session_last.ok_or(GapError::InsufficientData("no prior-session bar"))?;
    let first = session_first.ok_or(GapError::InsufficientData("no bars in session"))?;
    if prior.close.is_nan() || prior.close <= 0.0 {
        return Err(GapError::InsufficientData("prior-session close is not positive"));
    }

    let gap = gap_percent(prior.close, first.open);
    let direction = if gap < 0.0 {
        GapDirection::Down
    } else {
        GapDirection::Up
    };
    Ok(GapResult {
        previous_close: prior.close,
        session_open: first.open,
        gap_percent: gap,
        direction,
        meets_threshold: direction == target && gap.abs() >= min_gap_percent,
    })
}
