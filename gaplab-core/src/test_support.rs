//! Bar builders shared by the unit tests.

use chrono::TimeZone;
use chrono_tz::America::New_York;

use crate::domain::Bar;

/// Epoch ms of a New York local wall-clock time.
pub(crate) fn et_ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    New_York
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .timestamp_millis()
}

pub(crate) fn bar_at(
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
) -> Bar {
    Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Five-minute session bars from `(open, high, low, close, volume)` tuples,
/// starting 09:30 New York on 2025-11-14.
pub(crate) fn session_bars(rows: &[(f64, f64, f64, f64, u64)]) -> Vec<Bar> {
    let open = et_ms(2025, 11, 14, 9, 30);
    rows.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c, v))| bar_at(open + i as i64 * 300_000, o, h, l, c, v))
        .collect()
}

/// Last bar of the prior session (2025-11-13 15:55 New York) closing at `close`.
pub(crate) fn prior_close(close: f64) -> Bar {
    bar_at(et_ms(2025, 11, 13, 15, 55), close, close, close, close, 1_000)
}
