//! Markdown rendering of metrics reports and strategy comparisons.

use gaplab_core::domain::{time_of_day, Trade};

use crate::compare::{best_by_expectancy, StrategyComparison};
use crate::metrics::{MetricsReport, TimeBucket};

fn pct(v: Option<f64>) -> String {
    v.map(|x| format!("{:.1}%", x * 100.0))
        .unwrap_or_else(|| "N/A".to_string())
}

fn signed(v: Option<f64>) -> String {
    v.map(|x| format!("{x:+.2}%")).unwrap_or_else(|| "N/A".to_string())
}

fn trade_line(t: &Trade) -> String {
    format!(
        "| {} | {} | {} | {:+.2}% | {} |\n",
        t.ticker,
        t.date,
        t.entry_time
            .as_ref()
            .map(time_of_day::format)
            .unwrap_or_else(|| "N/A".to_string()),
        t.pnl_percent.unwrap_or(0.0),
        t.exit_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    )
}

fn trade_table(title: &str, trades: &[Trade], report: &mut String) {
    report.push_str(&format!("\n### {title}\n"));
    if trades.is_empty() {
        report.push_str("None\n");
        return;
    }
    report.push_str("| Ticker | Date | Entry | P&L | Exit |\n");
    report.push_str("|--------|------|-------|-----|------|\n");
    for t in trades {
        report.push_str(&trade_line(t));
    }
}

/// Render `metrics` under `title`.
pub fn render_report(title: &str, metrics: &MetricsReport) -> String {
    let mut report = format!(
        "# {title}\n\n\
## Summary\n\
- Records: {}\n\
- Trades: {}\n\
- Trades with validation errors: {}\n\
- Winners: {} ({})\n\
- Losers: {} ({})\n\
- Breakeven: {} ({})\n",
        metrics.total_records,
        metrics.trade_count,
        metrics.validation_error_count,
        metrics.winners,
        pct(metrics.win_rate),
        metrics.losers,
        pct(metrics.loss_rate),
        metrics.breakeven,
        pct(metrics.breakeven_rate),
    );

    if metrics.trade_count == 0 {
        report.push_str("\nNo trades executed\n");
        return report;
    }

    report.push_str(&format!(
        "\n## P&L\n\
- Avg Win: {:+.2}%\n\
- Avg Loss: {:+.2}%\n\
- Expectancy: {}\n\
- Total P&L: {:+.2}%\n\
- Profit Factor: {:.2}\n\
- Max Consecutive Wins: {}\n\
- Max Consecutive Losses: {}\n",
        metrics.avg_win,
        metrics.avg_loss,
        signed(metrics.expectancy),
        metrics.total_pnl,
        metrics.profit_factor,
        metrics.max_consecutive_wins,
        metrics.max_consecutive_losses,
    ));

    // Most frequent exit reason first.
    let mut reasons: Vec<_> = metrics.by_exit_reason.iter().collect();
    reasons.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(b.0)));
    report.push_str("\n## Exit Reasons\n");
    report.push_str("| Reason | Trades | Avg P&L | Win Rate |\n");
    report.push_str("|--------|--------|---------|----------|\n");
    for (reason, stats) in reasons {
        report.push_str(&format!(
            "| {} | {} | {:+.2}% | {:.1}% |\n",
            reason,
            stats.count,
            stats.avg_pnl,
            stats.win_rate * 100.0
        ));
    }

    report.push_str("\n## Entry Time\n");
    report.push_str("| Bucket | Trades | Avg P&L | Win Rate |\n");
    report.push_str("|--------|--------|---------|----------|\n");
    for bucket in TimeBucket::ALL {
        if let Some(stats) = metrics.by_time_bucket.get(&bucket) {
            report.push_str(&format!(
                "| {} | {} | {:+.2}% | {:.1}% |\n",
                bucket,
                stats.count,
                stats.avg_pnl,
                stats.win_rate * 100.0
            ));
        }
    }

    trade_table("Top Winners", &metrics.top_winners, &mut report);
    trade_table("Top Losers", &metrics.top_losers, &mut report);
    report
}

/// Render a comparison table, input order preserved.
pub fn render_comparison(rows: &[StrategyComparison]) -> String {
    let mut report = String::from("# Strategy Comparison\n\n");
    report.push_str("| Strategy | Trades | Win Rate | Expectancy | Avg Win | Avg Loss | PF | Total P&L |\n");
    report.push_str("|----------|--------|----------|------------|---------|----------|----|-----------|\n");
    for row in rows {
        let m = &row.metrics;
        if row.is_empty() {
            report.push_str(&format!(
                "| {} | 0 | No trades executed | | | | | |\n",
                row.name
            ));
            continue;
        }
        report.push_str(&format!(
            "| {} | {} | {} | {} | {:+.2}% | {:+.2}% | {:.2} | {:+.2}% |\n",
            row.name,
            m.trade_count,
            pct(m.win_rate),
            signed(m.expectancy),
            m.avg_win,
            m.avg_loss,
            m.profit_factor,
            m.total_pnl
        ));
    }
    if let Some(best) = best_by_expectancy(rows) {
        report.push_str(&format!("\nHighest expectancy: {}\n", best.name));
    }
    report
}
