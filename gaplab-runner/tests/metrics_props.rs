//! Property tests for metrics aggregation.

use chrono::{NaiveDate, NaiveTime};
use gaplab_core::domain::{ExitReason, Trade};
use gaplab_runner::metrics::{self, MetricsReport};
use proptest::prelude::*;

fn trade(pnl: Option<f64>, minute: u32) -> Trade {
    Trade {
        ticker: "AMD".into(),
        date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
        side: Default::default(),
        entry_time: NaiveTime::from_hms_opt(9 + minute / 60, minute % 60, 0),
        entry_price: 100.0,
        exit_time: None,
        exit_price: pnl.map(|p| 100.0 + p),
        exit_reason: pnl.map(|_| ExitReason::EndOfData),
        pnl_percent: pnl,
        lowest_price: 90.0,
        highest_price: 110.0,
        validation_errors: Vec::new(),
        gap_percent: None,
        pattern_strength: None,
    }
}

fn pnl_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(0.0)),
        6 => (-10.0f64..10.0).prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn rates_partition_closed_trades(
        records in prop::collection::vec((pnl_strategy(), 0u32..390), 1..60)
    ) {
        let trades: Vec<Trade> = records.iter().map(|(p, m)| trade(*p, *m)).collect();
        let report = MetricsReport::aggregate(&trades);

        prop_assert_eq!(report.total_records, trades.len());
        prop_assert_eq!(report.winners + report.losers + report.breakeven, report.trade_count);
        if report.trade_count == 0 {
            prop_assert!(report.win_rate.is_none());
        } else {
            let sum = report.win_rate.unwrap()
                + report.loss_rate.unwrap()
                + report.breakeven_rate.unwrap();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn groups_cover_every_closed_trade(
        records in prop::collection::vec((pnl_strategy(), 0u32..390), 0..60)
    ) {
        let trades: Vec<Trade> = records.iter().map(|(p, m)| trade(*p, *m)).collect();
        let report = MetricsReport::aggregate(&trades);

        let by_reason: usize = report.by_exit_reason.values().map(|g| g.count).sum();
        let by_bucket: usize = report.by_time_bucket.values().map(|g| g.count).sum();
        prop_assert_eq!(by_reason, report.trade_count);
        prop_assert_eq!(by_bucket, report.trade_count);
        prop_assert!(report.top_winners.len() <= metrics::TOP_N);
        prop_assert!(report.top_winners.iter().all(|t| t.is_winner()));
        prop_assert!(report.top_losers.iter().all(|t| t.is_loser()));
    }

    #[test]
    fn profit_factor_is_zero_without_losses(pnls in prop::collection::vec(0.0f64..10.0, 0..40)) {
        prop_assert_eq!(metrics::profit_factor(&pnls), 0.0);
        prop_assert_eq!(metrics::avg_loss(&pnls), 0.0);
    }

    #[test]
    fn total_is_gross_profit_minus_gross_loss(pnls in prop::collection::vec(-10.0f64..10.0, 0..40)) {
        let total = metrics::total_pnl(&pnls);
        let net = metrics::gross_profit(&pnls) - metrics::gross_loss(&pnls);
        prop_assert!((total - net).abs() < 1e-9);
    }
}
