//! Position side and the directional arithmetic that depends on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a simulated position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    /// Directional return in percent: long `(exit - entry) / entry * 100`,
    /// short inverted.
    pub fn pnl_percent(self, entry_price: f64, exit_price: f64) -> f64 {
        self.sign() * (exit_price - entry_price) / entry_price * 100.0
    }

    /// Price `pct` percent against the position (stop side).
    pub fn adverse_level(self, entry_price: f64, pct: f64) -> f64 {
        entry_price * (1.0 - self.sign() * pct / 100.0)
    }

    /// Price `pct` percent in favour of the position (target side).
    pub fn favorable_level(self, entry_price: f64, pct: f64) -> f64 {
        entry_price * (1.0 + self.sign() * pct / 100.0)
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}
