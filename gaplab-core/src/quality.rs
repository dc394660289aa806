//! Session data-quality checks.
//!
//! Problems found here never abort a scan; they are returned as human-readable
//! warnings alongside the scan result.

use crate::domain::Bar;
use crate::session::SessionWindow;

/// Per-bar warnings beyond this count are summarised in one line.
const MAX_BAR_WARNINGS: usize = 10;

/// Local `HH:MM` label for a bar, falling back to the raw timestamp.
pub fn bar_label(bar: &Bar, window: &SessionWindow) -> String {
    window
        .time_of_day(bar.timestamp)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| bar.timestamp.to_string())
}

/// Warnings for one day session.
pub fn session_warnings(bars: &[Bar], window: &SessionWindow) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(first) = bars.first() else {
        warnings.push("no bars in session window".to_string());
        return warnings;
    };

    if let Some(t) = window.time_of_day(first.timestamp) {
        if t > window.start {
            warnings.push(format!(
                "first session bar at {} but session opens at {}; opening bars may be missing",
                t.format("%H:%M"),
                window.start.format("%H:%M")
            ));
        }
    }

    let insane: Vec<&Bar> = bars.iter().filter(|b| !b.is_sane()).collect();
    for bar in insane.iter().take(MAX_BAR_WARNINGS) {
        warnings.push(format!(
            "bar at {} violates OHLC bounds (O {:.4} H {:.4} L {:.4} C {:.4})",
            bar_label(bar, window),
            bar.open,
            bar.high,
            bar.low,
            bar.close
        ));
    }
    if insane.len() > MAX_BAR_WARNINGS {
        warnings.push(format!(
            "{} more bars violate OHLC bounds",
            insane.len() - MAX_BAR_WARNINGS
        ));
    }

    let zero_volume = bars.iter().filter(|b| b.volume == 0).count();
    if zero_volume == bars.len() {
        warnings.push(format!(
            "all {} session bars have zero volume; VWAP and volume ratio are undefined",
            bars.len()
        ));
    } else if zero_volume > 0 {
        warnings.push(format!(
            "{zero_volume} of {} session bars have zero volume",
            bars.len()
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::session_bars;

    #[test]
    fn clean_session_has_no_warnings() {
        let bars = session_bars(&[(10.0, 11.0, 9.0, 10.5, 100), (10.5, 11.0, 10.0, 10.2, 100)]);
        assert!(session_warnings(&bars, &SessionWindow::default()).is_empty());
    }

    #[test]
    fn flags_insane_bar_and_zero_volume() {
        let bars = session_bars(&[(10.0, 9.0, 9.5, 10.5, 0), (10.5, 11.0, 10.0, 10.2, 100)]);
        let w = session_warnings(&bars, &SessionWindow::default());
        assert_eq!(w.len(), 2);
        assert!(w[0].starts_with("bar at 09:30 violates OHLC bounds"));
        assert_eq!(w[1], "1 of 2 session bars have zero volume");
    }

    #[test]
    fn flags_all_zero_volume() {
        let bars = session_bars(&[(10.0, 11.0, 9.0, 10.5, 0), (10.5, 11.0, 10.0, 10.2, 0)]);
        let w = session_warnings(&bars, &SessionWindow::default());
        assert!(w[0].starts_with("all 2 session bars have zero volume"));
    }

    #[test]
    fn flags_late_first_bar() {
        let mut bars = session_bars(&[(10.0, 11.0, 9.0, 10.5, 100)]);
        bars[0].timestamp += 45 * 60_000;
        let w = session_warnings(&bars, &SessionWindow::default());
        assert!(w[0].starts_with("first session bar at 10:15"));
    }

    #[test]
    fn empty_session() {
        assert_eq!(
            session_warnings(&[], &SessionWindow::default()),
            vec!["no bars in session window".to_string()]
        );
    }
}
