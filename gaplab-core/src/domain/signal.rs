//! Signal — a qualifying gap + VWAP-reclaim entry produced by the scanner.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::position::PositionSide;
use super::time_of_day;

/// One entry signal. Field names follow the scanner debug payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    pub date: NaiveDate,
    /// Local time-of-day of the signal bar.
    #[serde(with = "time_of_day")]
    pub signal_time: NaiveTime,
    /// Open time of the signal bar, epoch milliseconds (UTC).
    pub timestamp: i64,
    /// Close of the signal bar. The simulator does not fill here.
    pub entry_price: f64,
    pub gap_percent: f64,
    pub vwap_crosses: u32,
    pub volume_ratio: f64,
    pub pattern_strength: f64,
    pub side: PositionSide,
}
