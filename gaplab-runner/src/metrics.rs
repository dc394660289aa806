//! Trade metrics — pure functions over percent pnls plus the grouped report.
//!
//! Only closed trades (`pnl_percent` present) count. Undefined ratios are
//! `None` (rendered "N/A"); averages over an empty side are 0.0.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveTime, Timelike};
use gaplab_core::domain::{ExitReason, Trade};
use serde::{Deserialize, Serialize};

/// Number of trades listed in each of `top_winners` / `top_losers`.
pub const TOP_N: usize = 5;

/// Entry-time bucket of the regular session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeBucket {
    #[serde(rename = "09:30-10:00")]
    Open,
    #[serde(rename = "10:00-11:00")]
    TenToEleven,
    #[serde(rename = "11:00-12:00")]
    ElevenToNoon,
    #[serde(rename = "12:00-13:00")]
    NoonToOne,
    #[serde(rename = "13:00+")]
    Afternoon,
}

impl TimeBucket {
    pub const ALL: [TimeBucket; 5] = [
        TimeBucket::Open,
        TimeBucket::TenToEleven,
        TimeBucket::ElevenToNoon,
        TimeBucket::NoonToOne,
        TimeBucket::Afternoon,
    ];

    /// Bucket by entry hour; anything before 10:00 is the opening bucket.
    pub fn from_time(t: NaiveTime) -> Self {
        match t.hour() {
            0..=9 => TimeBucket::Open,
            10 => TimeBucket::TenToEleven,
            11 => TimeBucket::ElevenToNoon,
            12 => TimeBucket::NoonToOne,
            _ => TimeBucket::Afternoon,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeBucket::Open => "09:30-10:00",
            TimeBucket::TenToEleven => "10:00-11:00",
            TimeBucket::ElevenToNoon => "11:00-12:00",
            TimeBucket::NoonToOne => "12:00-13:00",
            TimeBucket::Afternoon => "13:00+",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of one group of closed trades. Groups are never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub total_pnl: f64,
}

impl GroupStats {
    fn from_pnls(pnls: &[f64]) -> Self {
        let total: f64 = pnls.iter().sum();
        let winners = pnls.iter().filter(|p| **p > 0.0).count();
        Self {
            count: pnls.len(),
            winners,
            losers: pnls.iter().filter(|p| **p < 0.0).count(),
            win_rate: winners as f64 / pnls.len() as f64,
            avg_pnl: total / pnls.len() as f64,
            total_pnl: total,
        }
    }
}

/// Aggregate statistics over a set of trade records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    // ── Counts ──
    pub total_records: usize,
    pub trade_count: usize,
    pub winners: usize,
    pub losers: usize,
    pub breakeven: usize,
    pub validation_error_count: usize,

    // ── Rates (fractions of trade_count) ──
    pub win_rate: Option<f64>,
    pub loss_rate: Option<f64>,
    pub breakeven_rate: Option<f64>,

    // ── Percent pnl ──
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_pnl: Option<f64>,
    pub expectancy: Option<f64>,
    pub total_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,

    // ── Streaks ──
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // ── Breakdowns ──
    pub by_exit_reason: BTreeMap<ExitReason, GroupStats>,
    pub by_time_bucket: BTreeMap<TimeBucket, GroupStats>,
    pub top_winners: Vec<Trade>,
    pub top_losers: Vec<Trade>,
}

impl MetricsReport {
    /// Aggregate trade records. Records without a pnl are counted in
    /// `total_records` only.
    pub fn aggregate(records: &[Trade]) -> Self {
        let closed: Vec<&Trade> = records.iter().filter(|t| t.is_closed()).collect();
        let pnls: Vec<f64> = closed.iter().filter_map(|t| t.pnl_percent).collect();
        let n = pnls.len();

        let winners = pnls.iter().filter(|p| **p > 0.0).count();
        let losers = pnls.iter().filter(|p| **p < 0.0).count();
        let breakeven = n - winners - losers;
        let total = total_pnl(&pnls);
        let avg = (n > 0).then(|| total / n as f64);

        let mut by_reason: BTreeMap<ExitReason, Vec<f64>> = BTreeMap::new();
        let mut by_bucket: BTreeMap<TimeBucket, Vec<f64>> = BTreeMap::new();
        for (trade, pnl) in closed.iter().zip(&pnls) {
            by_reason
                .entry(trade.exit_reason.unwrap_or(ExitReason::Other))
                .or_default()
                .push(*pnl);
            if let Some(t) = trade.entry_time {
                by_bucket.entry(TimeBucket::from_time(t)).or_default().push(*pnl);
            }
        }

        Self {
            total_records: records.len(),
            trade_count: n,
            winners,
            losers,
            breakeven,
            validation_error_count: closed.iter().filter(|t| t.has_validation_errors()).count(),
            win_rate: rate(winners, n),
            loss_rate: rate(losers, n),
            breakeven_rate: rate(breakeven, n),
            avg_win: avg_win(&pnls),
            avg_loss: avg_loss(&pnls),
            avg_pnl: avg,
            expectancy: avg,
            total_pnl: total,
            gross_profit: gross_profit(&pnls),
            gross_loss: gross_loss(&pnls),
            profit_factor: profit_factor(&pnls),
            max_consecutive_wins: max_consecutive_wins(&pnls),
            max_consecutive_losses: max_consecutive_losses(&pnls),
            by_exit_reason: by_reason
                .into_iter()
                .map(|(k, v)| (k, GroupStats::from_pnls(&v)))
                .collect(),
            by_time_bucket: by_bucket
                .into_iter()
                .map(|(k, v)| (k, GroupStats::from_pnls(&v)))
                .collect(),
            top_winners: top_trades(&closed, true),
            top_losers: top_trades(&closed, false),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

fn rate(count: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| count as f64 / total as f64)
}

pub fn total_pnl(pnls: &[f64]) -> f64 {
    pnls.iter().sum()
}

/// Sum of positive pnls.
pub fn gross_profit(pnls: &[f64]) -> f64 {
    pnls.iter().filter(|p| **p > 0.0).sum()
}

/// Absolute sum of negative pnls.
pub fn gross_loss(pnls: &[f64]) -> f64 {
    pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum()
}

/// Gross profit / gross loss. Returns 0.0 when there is no loss.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let loss = gross_loss(pnls);
    if loss <= 0.0 {
        return 0.0;
    }
    gross_profit(pnls) / loss
}

/// Mean of positive pnls, 0.0 without winners.
pub fn avg_win(pnls: &[f64]) -> f64 {
    mean_of(pnls.iter().copied().filter(|p| *p > 0.0))
}

/// Mean of negative pnls (negative), 0.0 without losers.
pub fn avg_loss(pnls: &[f64]) -> f64 {
    mean_of(pnls.iter().copied().filter(|p| *p < 0.0))
}

pub fn max_consecutive_wins(pnls: &[f64]) -> usize {
    max_consecutive(pnls, |p| p > 0.0)
}

pub fn max_consecutive_losses(pnls: &[f64]) -> usize {
    max_consecutive(pnls, |p| p < 0.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn max_consecutive(pnls: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for &pnl in pnls {
        if pred(pnl) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

/// Best winners (descending) or worst losers (ascending), at most `TOP_N`.
fn top_trades(closed: &[&Trade], winners: bool) -> Vec<Trade> {
    let mut side: Vec<&Trade> = closed
        .iter()
        .copied()
        .filter(|t| if winners { t.is_winner() } else { t.is_loser() })
        .collect();
    side.sort_by(|a, b| {
        let (pa, pb) = (a.pnl_percent.unwrap_or(0.0), b.pnl_percent.unwrap_or(0.0));
        if winners {
            pb.total_cmp(&pa)
        } else {
            pa.total_cmp(&pb)
        }
    });
    side.into_iter().take(TOP_N).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gaplab_core::domain::PositionSide;

    fn make_trade(pnl: Option<f64>, reason: ExitReason, entry: &str) -> Trade {
        Trade {
            ticker: "AMD".into(),
            date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            side: PositionSide::Long,
            entry_time: gaplab_core::domain::time_of_day::parse(entry),
            entry_price: 100.0,
            exit_time: None,
            exit_price: pnl.map(|p| 100.0 + p),
            exit_reason: pnl.map(|_| reason),
            pnl_percent: pnl,
            lowest_price: 95.0,
            highest_price: 105.0,
            validation_errors: Vec::new(),
            gap_percent: None,
            pattern_strength: None,
        }
    }

    fn closed(pnl: f64) -> Trade {
        let reason = if pnl > 0.0 {
            ExitReason::Target
        } else {
            ExitReason::StopLoss
        };
        make_trade(Some(pnl), reason, "10:15")
    }

    // ── Aggregate ──

    #[test]
    fn empty_input_is_all_zero_or_undefined() {
        let m = MetricsReport::aggregate(&[]);
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.win_rate, None);
        assert_eq!(m.avg_pnl, None);
        assert_eq!(m.expectancy, None);
        assert_eq!(m.avg_win, 0.0);
        assert_eq!(m.avg_loss, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.total_pnl, 0.0);
        assert!(m.by_exit_reason.is_empty());
        assert!(m.by_time_bucket.is_empty());
    }

    #[test]
    fn null_pnl_records_are_counted_but_excluded() {
        let trades = vec![
            closed(2.0),
            make_trade(None, ExitReason::Other, "09:45"),
            closed(-1.0),
        ];
        let m = MetricsReport::aggregate(&trades);
        assert_eq!(m.total_records, 3);
        assert_eq!(m.trade_count, 2);
        assert_eq!(m.win_rate, Some(0.5));
    }

    #[test]
    fn basic_statistics() {
        let trades = vec![closed(4.0), closed(-2.0), closed(2.0), closed(0.0), closed(-1.0)];
        let m = MetricsReport::aggregate(&trades);
        assert_eq!((m.winners, m.losers, m.breakeven), (2, 2, 1));
        assert_eq!(m.avg_win, 3.0);
        assert_eq!(m.avg_loss, -1.5);
        assert_eq!(m.gross_profit, 6.0);
        assert_eq!(m.gross_loss, 3.0);
        assert_eq!(m.profit_factor, 2.0);
        assert!((m.avg_pnl.unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(m.expectancy, m.avg_pnl);
        let rates = m.win_rate.unwrap() + m.loss_rate.unwrap() + m.breakeven_rate.unwrap();
        assert!((rates - 1.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_is_zero_without_losers() {
        let m = MetricsReport::aggregate(&[closed(1.0), closed(3.0)]);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.gross_loss, 0.0);
        assert_eq!(m.avg_loss, 0.0);
    }

    #[test]
    fn groups_by_exit_reason() {
        let trades = vec![closed(4.0), closed(4.0), closed(-2.0)];
        let m = MetricsReport::aggregate(&trades);
        assert_eq!(m.by_exit_reason.len(), 2);
        let target = &m.by_exit_reason[&ExitReason::Target];
        assert_eq!(target.count, 2);
        assert_eq!(target.avg_pnl, 4.0);
        assert_eq!(m.by_exit_reason[&ExitReason::StopLoss].win_rate, 0.0);
    }

    #[test]
    fn groups_by_entry_hour_and_skips_missing_times() {
        let trades = vec![
            make_trade(Some(1.0), ExitReason::Target, "09:35"),
            make_trade(Some(-1.0), ExitReason::StopLoss, "09:59:59"),
            make_trade(Some(2.0), ExitReason::Target, "12:10"),
            make_trade(Some(2.0), ExitReason::Target, "15:00"),
            make_trade(Some(2.0), ExitReason::Target, ""),
        ];
        let m = MetricsReport::aggregate(&trades);
        let open = &m.by_time_bucket[&TimeBucket::Open];
        assert_eq!(open.count, 2);
        assert_eq!(open.win_rate, 0.5);
        assert_eq!(m.by_time_bucket[&TimeBucket::NoonToOne].count, 1);
        assert_eq!(m.by_time_bucket[&TimeBucket::Afternoon].count, 1);
        assert!(!m.by_time_bucket.contains_key(&TimeBucket::TenToEleven));
        let bucketed: usize = m.by_time_bucket.values().map(|g| g.count).sum();
        assert_eq!(bucketed, 4);
    }

    #[test]
    fn top_lists_are_ordered_and_capped() {
        let trades: Vec<Trade> = [1.0, 7.0, 3.0, 5.0, 2.0, 6.0, -4.0, -1.0, -3.0]
            .into_iter()
            .map(closed)
            .collect();
        let m = MetricsReport::aggregate(&trades);
        let best: Vec<f64> = m.top_winners.iter().filter_map(|t| t.pnl_percent).collect();
        assert_eq!(best, vec![7.0, 6.0, 5.0, 3.0, 2.0]);
        let worst: Vec<f64> = m.top_losers.iter().filter_map(|t| t.pnl_percent).collect();
        assert_eq!(worst, vec![-4.0, -3.0, -1.0]);
    }

    #[test]
    fn counts_trades_with_validation_errors() {
        let mut bad = closed(1.0);
        bad.validation_errors.push("lowestPrice 101.0000 is above ...".into());
        let m = MetricsReport::aggregate(&[bad, closed(2.0)]);
        assert_eq!(m.validation_error_count, 1);
    }

    // ── Streaks ──

    #[test]
    fn streaks_break_on_breakeven() {
        let pnls = [1.0, 2.0, 0.0, 1.0, -1.0, -2.0, -3.0, 1.0];
        assert_eq!(max_consecutive_wins(&pnls), 2);
        assert_eq!(max_consecutive_losses(&pnls), 3);
    }

    #[test]
    fn time_bucket_labels_serialize() {
        let json = serde_json::to_string(&TimeBucket::Afternoon).unwrap();
        assert_eq!(json, "\"13:00+\"");
        assert_eq!(TimeBucket::Open.to_string(), "09:30-10:00");
    }
}
