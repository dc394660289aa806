//! End-to-end scenarios: bar series → session → gap → scan → simulate.

use chrono::{NaiveDate, NaiveTime};
use gaplab_core::domain::{Bar, BarSeries, ExitReason, PositionSide};
use gaplab_core::gap::{classify_gap, GapDirection};
use gaplab_core::scanner::{scan, ScanState, ScannerConfig, SkipReason};
use gaplab_core::session::SessionWindow;
use gaplab_core::simulator::{simulate, ExitRules};

// ── Helpers ──────────────────────────────────────────────────────────

/// 2025-11-14 09:30 America/New_York (EST), epoch ms.
const NOV14_OPEN: i64 = 1_763_130_600_000;
/// 2025-11-13 15:55 America/New_York.
const NOV13_LAST: i64 = 1_763_067_300_000;
const FIVE_MIN: i64 = 300_000;

fn bar(timestamp: i64, o: f64, h: f64, l: f64, c: f64, v: u64) -> Bar {
    Bar {
        timestamp,
        open: o,
        high: h,
        low: l,
        close: c,
        volume: v,
    }
}

fn nov14() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 14).unwrap()
}

fn day_bars(start: i64, rows: &[(f64, f64, f64, f64, u64)]) -> Vec<Bar> {
    rows.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c, v))| bar(start + i as i64 * FIVE_MIN, o, h, l, c, v))
        .collect()
}

/// Prior session closing at 500 (plus an after-hours print that must be
/// ignored), then a gap-down session that reclaims VWAP on the fifth bar.
fn qqq_series() -> BarSeries {
    let mut bars = vec![
        bar(NOV13_LAST - FIVE_MIN, 501.0, 501.5, 500.5, 501.0, 800),
        bar(NOV13_LAST, 501.0, 501.2, 499.8, 500.0, 900),
        // 17:00 after-hours
        bar(NOV13_LAST + 13 * FIVE_MIN, 499.0, 499.0, 480.0, 480.0, 50),
    ];
    bars.extend(day_bars(
        NOV14_OPEN,
        &[
            (495.0, 495.5, 493.0, 493.2, 100),
            (493.2, 493.6, 492.0, 492.1, 100),
            (492.1, 492.5, 491.0, 491.2, 100),
            (491.2, 491.6, 490.5, 490.6, 100),
            (490.6, 495.0, 490.5, 494.8, 500),
            (494.9, 496.0, 494.5, 495.5, 300),
            (495.5, 497.0, 495.0, 496.8, 300),
        ],
    ));
    BarSeries::new("QQQ", bars).unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn qqq_one_percent_gap_down_uses_regular_session_close() {
    let series = qqq_series();
    let w = SessionWindow::default();
    let session = series.session(nov14(), &w);
    let prior = series.prior_session_last_bar(nov14(), &w);
    assert_eq!(prior.map(|b| b.close), Some(500.0));

    let gap = classify_gap(prior, session.first(), GapDirection::Down, 1.0).unwrap();
    assert!((gap.gap_percent - -1.0).abs() < 1e-9);
    assert_eq!(gap.direction, GapDirection::Down);
    assert!(gap.meets_threshold);
}

#[test]
fn gap_reclaim_signal_flows_into_trade() {
    let series = qqq_series();
    let w = SessionWindow::default();
    let session = series.session(nov14(), &w);
    let prior = series.prior_session_last_bar(nov14(), &w);

    let outcome = scan("QQQ", nov14(), session, prior, &ScannerConfig::default(), &w);
    assert_eq!(outcome.final_state, ScanState::Signaled);
    let signal = outcome.signal().unwrap();
    assert!((signal.volume_ratio - 5.0).abs() < 1e-12);
    assert_eq!(signal.signal_time, NaiveTime::from_hms_opt(9, 50, 0).unwrap());
    assert_eq!(signal.side, PositionSide::Long);

    let trade = simulate(signal, session, &ExitRules::default(), &w).unwrap();
    assert_eq!(trade.entry_price, 494.9);
    assert_eq!(trade.entry_time, NaiveTime::from_hms_opt(9, 55, 0));
    assert_eq!(trade.exit_reason, Some(ExitReason::EndOfData));
    assert_eq!(trade.exit_price, Some(496.8));
    let expected = (496.8 - 494.9) / 494.9 * 100.0;
    assert!((trade.pnl_percent.unwrap() - expected).abs() < 1e-9);
    assert_eq!(trade.lowest_price, 494.5);
    assert_eq!(trade.highest_price, 497.0);
    assert!(trade.validation_errors.is_empty());
}

#[test]
fn first_day_in_series_is_insufficient_data() {
    let series = qqq_series();
    let w = SessionWindow::default();
    let nov13 = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
    let outcome = scan(
        "QQQ",
        nov13,
        series.session(nov13, &w),
        series.prior_session_last_bar(nov13, &w),
        &ScannerConfig::default(),
        &w,
    );
    assert!(matches!(
        outcome.skip_reason,
        Some(SkipReason::InsufficientData { .. })
    ));
    assert!(outcome.signals.is_empty());
}

#[test]
fn gap_up_config_ignores_gap_down_day() {
    let series = qqq_series();
    let w = SessionWindow::default();
    let cfg = ScannerConfig {
        direction: GapDirection::Up,
        ..ScannerConfig::default()
    };
    let outcome = scan(
        "QQQ",
        nov14(),
        series.session(nov14(), &w),
        series.prior_session_last_bar(nov14(), &w),
        &cfg,
        &w,
    );
    assert_eq!(outcome.skip_reason, Some(SkipReason::GapNotMet));
}

#[test]
fn three_percent_stop_through_to_nine_fifty_loses_five_percent() {
    let bars = day_bars(
        NOV14_OPEN,
        &[
            (10.2, 10.3, 9.9, 10.1, 1_000),
            (10.0, 10.05, 9.5, 9.55, 1_000),
            (9.55, 9.8, 9.5, 9.7, 1_000),
        ],
    );
    let signal = gaplab_core::domain::Signal {
        ticker: "MU".into(),
        date: nov14(),
        signal_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        timestamp: bars[0].timestamp,
        entry_price: bars[0].close,
        gap_percent: -2.0,
        vwap_crosses: 1,
        volume_ratio: 1.3,
        pattern_strength: 25.0,
        side: PositionSide::Long,
    };
    let rules = ExitRules {
        stop_loss_pct: 3.0,
        ..ExitRules::default()
    };
    let trade = simulate(&signal, &bars, &rules, &SessionWindow::default()).unwrap();
    assert_eq!(trade.exit_reason, Some(ExitReason::StopLoss));
    assert!((trade.pnl_percent.unwrap() - -5.0).abs() < 1e-9);
    assert_eq!(trade.lowest_price, 9.5);
}
