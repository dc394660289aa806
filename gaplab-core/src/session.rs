//! Trading-session windows.
//!
//! A bar belongs to the session of local date `D` when its local open time
//! falls in `[start, end)`. Local time is resolved through chrono-tz, so the
//! UTC offset of the window follows daylight-saving changes per date.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{time_of_day, Bar, BarSeries};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("session start {start} must be before end {end}")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },
}

/// Regular-hours window in a named time zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionWindow {
    #[serde(with = "tz_name")]
    pub timezone: Tz,
    #[serde(with = "time_of_day")]
    pub start: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end: NaiveTime,
}

impl Default for SessionWindow {
    /// US equities regular hours, 09:30–16:00 New York.
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }
}

impl SessionWindow {
    pub fn new(timezone: Tz, start: NaiveTime, end: NaiveTime) -> Result<Self, SessionError> {
        let window = Self {
            timezone,
            start,
            end,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.start >= self.end {
            return Err(SessionError::EmptyWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Converts an epoch-ms timestamp into the window's time zone.
    pub fn local(&self, timestamp: i64) -> Option<DateTime<Tz>> {
        DateTime::from_timestamp_millis(timestamp).map(|utc| utc.with_timezone(&self.timezone))
    }

    /// Local time-of-day of a timestamp.
    pub fn time_of_day(&self, timestamp: i64) -> Option<NaiveTime> {
        self.local(timestamp).map(|dt| dt.time())
    }

    /// Local session date of a timestamp, or `None` outside regular hours.
    pub fn session_date(&self, timestamp: i64) -> Option<NaiveDate> {
        let local = self.local(timestamp)?;
        let t = local.time();
        (t >= self.start && t < self.end).then(|| local.date_naive())
    }

    /// UTC bounds `[open, close)` of the session on `date`, in epoch ms.
    pub fn bounds(&self, date: NaiveDate) -> Option<(i64, i64)> {
        let open = self
            .timezone
            .from_local_datetime(&date.and_time(self.start))
            .earliest()?;
        let close = self
            .timezone
            .from_local_datetime(&date.and_time(self.end))
            .earliest()?;
        Some((open.timestamp_millis(), close.timestamp_millis()))
    }
}

/// Bars of `bars` (sorted) that fall in the session of `date`.
pub fn session_slice<'a>(bars: &'a [Bar], date: NaiveDate, window: &SessionWindow) -> &'a [Bar] {
    let Some((open, close)) = window.bounds(date) else {
        return &[];
    };
    let lo = bars.partition_point(|b| b.timestamp < open);
    let hi = bars.partition_point(|b| b.timestamp < close).max(lo);
    &bars[lo..hi]
}

impl BarSeries {
    /// The day session for `date`: a contiguous, ordered slice.
    pub fn session(&self, date: NaiveDate, window: &SessionWindow) -> &[Bar] {
        session_slice(self.bars(), date, window)
    }

    /// Last in-session bar of the most recent trading day before `date`.
    ///
    /// Weekends and holidays are skipped because only dates that actually
    /// have session bars count as trading days.
    pub fn prior_session_last_bar(&self, date: NaiveDate, window: &SessionWindow) -> Option<&Bar> {
        let (open, _) = window.bounds(date)?;
        let before = &self.bars()[..self.bars().partition_point(|b| b.timestamp < open)];
        before
            .iter()
            .rev()
            .find(|b| window.session_date(b.timestamp).is_some_and(|d| d < date))
    }

    /// Distinct session dates present in the series, ascending.
    pub fn trading_dates(&self, window: &SessionWindow) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .bars()
            .iter()
            .filter_map(|b| window.session_date(b.timestamp))
            .collect();
        dates.dedup();
        dates
    }
}

mod tz_name {
    use chrono_tz::Tz;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tz, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<Tz>()
            .map_err(|_| D::Error::custom(format!("unknown time zone '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bar_at, et_ms};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn bounds_follow_dst() {
        let w = SessionWindow::default();
        // EST (UTC-5): 09:30 local = 14:30 UTC
        let (open, _) = w.bounds(d(2025, 11, 14)).unwrap();
        assert_eq!(open, 1_763_130_600_000);
        // EDT (UTC-4): 09:30 local = 13:30 UTC
        let (open, _) = w.bounds(d(2025, 7, 15)).unwrap();
        assert_eq!(open, 1_752_586_200_000);
    }

    #[test]
    fn session_excludes_premarket_and_close() {
        let w = SessionWindow::default();
        let bars = vec![
            bar_at(et_ms(2025, 11, 14, 9, 25), 10.0, 10.0, 10.0, 10.0, 1),
            bar_at(et_ms(2025, 11, 14, 9, 30), 10.0, 10.0, 10.0, 10.0, 1),
            bar_at(et_ms(2025, 11, 14, 15, 55), 10.0, 10.0, 10.0, 10.0, 1),
            bar_at(et_ms(2025, 11, 14, 16, 0), 10.0, 10.0, 10.0, 10.0, 1),
        ];
        let series = BarSeries::new("QQQ", bars).unwrap();
        let session = series.session(d(2025, 11, 14), &w);
        assert_eq!(session.len(), 2);
        assert_eq!(session[0].timestamp, et_ms(2025, 11, 14, 9, 30));
    }

    #[test]
    fn prior_session_skips_weekend_and_after_hours() {
        let w = SessionWindow::default();
        let bars = vec![
            bar_at(et_ms(2025, 11, 7, 15, 55), 10.0, 10.0, 10.0, 9.5, 1),
            bar_at(et_ms(2025, 11, 7, 17, 0), 10.0, 10.0, 10.0, 9.9, 1),
            bar_at(et_ms(2025, 11, 10, 9, 30), 10.0, 10.0, 10.0, 10.0, 1),
        ];
        let series = BarSeries::new("QQQ", bars).unwrap();
        let prior = series.prior_session_last_bar(d(2025, 11, 10), &w).unwrap();
        assert_eq!(prior.close, 9.5);
        assert!(series.prior_session_last_bar(d(2025, 11, 7), &w).is_none());
    }

    #[test]
    fn trading_dates_are_distinct() {
        let w = SessionWindow::default();
        let bars = vec![
            bar_at(et_ms(2025, 11, 13, 9, 30), 10.0, 10.0, 10.0, 10.0, 1),
            bar_at(et_ms(2025, 11, 13, 9, 35), 10.0, 10.0, 10.0, 10.0, 1),
            bar_at(et_ms(2025, 11, 14, 9, 30), 10.0, 10.0, 10.0, 10.0, 1),
        ];
        let series = BarSeries::new("QQQ", bars).unwrap();
        assert_eq!(
            series.trading_dates(&w),
            vec![d(2025, 11, 13), d(2025, 11, 14)]
        );
    }

    #[test]
    fn rejects_empty_window() {
        let t = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(SessionWindow::new(chrono_tz::UTC, t, t).is_err());
    }

    #[test]
    fn deserializes_short_times() {
        let w: SessionWindow =
            serde_json::from_str(r#"{"timezone":"Europe/London","start":"08:00","end":"16:30"}"#)
                .unwrap();
        assert_eq!(w.timezone, chrono_tz::Europe::London);
        assert_eq!(w.end, NaiveTime::from_hms_opt(16, 30, 0).unwrap());
    }
}
