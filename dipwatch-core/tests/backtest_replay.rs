//! End-to-end replay of the dip-in-uptrend rule on hand-built histories.
//!
//! The base series is flat at 100, where the close never sits strictly above
//! the long MA, so nothing fires. Single-bar spikes create the triggers; each
//! exit bar ten sessions later closes exactly 5% above its entry.

use chrono::{Duration, NaiveDate};
use dipwatch_core::backtest::{replay, run_backtest, BacktestSummary};
use dipwatch_core::domain::{Bar, PriceSeries};
use dipwatch_core::indicators::IndicatorFrame;
use dipwatch_core::params::StrategyParams;

const ENTRY: f64 = 101.0;
const EXIT: f64 = 106.05;

fn params() -> StrategyParams {
    StrategyParams {
        short_window: 3,
        long_window: 6,
        proximity_threshold: 0.01,
        holding_period: 10,
        ..StrategyParams::default()
    }
}

fn bar(date: NaiveDate, close: f64, low: f64) -> Bar {
    Bar {
        date,
        open: close,
        high: close + 1.0,
        low,
        close,
        volume: 10_000,
    }
}

/// `n` flat bars with a trigger spike at each index in `entries` and its
/// +5% exit bar `hold` sessions later.
fn spiked_series(n: usize, entries: &[usize], hold: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let bars = (0..n)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            if entries.contains(&i) {
                // low 100 sits well inside short_ma * 1.01
                bar(date, ENTRY, 100.0)
            } else if entries.iter().any(|&e| e + hold == i) {
                // low far above the short MA so the exit bar cannot trigger
                bar(date, EXIT, 106.0)
            } else {
                bar(date, 100.0, 99.0)
            }
        })
        .collect();
    PriceSeries::new("SPIKE", bars).unwrap()
}

#[test]
fn three_triggers_each_up_five_percent() {
    // Given a 300-bar history with triggers at bars 50, 150 and 250
    let params = params();
    let series = spiked_series(300, &[50, 150, 250], params.holding_period);
    let frame = IndicatorFrame::build(series, &params);

    // When the rule is replayed
    let report = replay(&frame, &params);

    // Then exactly those three entries are recorded
    let entry_days: Vec<i64> = report
        .trades
        .iter()
        .map(|t| (t.entry_date - NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()).num_days())
        .collect();
    assert_eq!(entry_days, vec![50, 150, 250]);

    // And the summary reports 3 trades, 100% wins, +5% on average
    match report.summary {
        BacktestSummary::Trades {
            trade_count,
            win_rate_pct,
            average_return_pct,
        } => {
            assert_eq!(trade_count, 3);
            assert!((win_rate_pct - 100.0).abs() < 1e-9);
            assert!((average_return_pct - 5.0).abs() < 1e-9);
        }
        BacktestSummary::InsufficientEvidence => panic!("expected trades"),
    }
}

#[test]
fn trigger_without_full_holding_window_is_discarded() {
    // Given a trigger five bars before the end of the series
    let params = params();
    let series = spiked_series(300, &[50, 295], params.holding_period);
    let frame = IndicatorFrame::build(series, &params);

    // When the rule is replayed
    let report = replay(&frame, &params);

    // Then only the complete trade counts
    assert_eq!(report.summary.trade_count(), 1);
    assert_eq!(report.trades[0].exit_close, EXIT);
}

#[test]
fn flat_history_has_no_evidence() {
    // Given a history that never trends
    let params = params();
    let series = spiked_series(300, &[], params.holding_period);
    let frame = IndicatorFrame::build(series, &params);

    // When the rule is replayed
    let summary = run_backtest(&frame, &params);

    // Then the result is "no evidence", not a 0% win rate
    assert_eq!(summary, BacktestSummary::InsufficientEvidence);
    assert_eq!(summary.win_rate_pct(), None);
    assert_eq!(summary.average_return_pct(), None);
}

#[test]
fn losing_exit_lowers_win_rate() {
    // Given one winning spike and one spike that decays to 95 ten bars later
    let params = params();
    let mut bars = spiked_series(120, &[30], params.holding_period)
        .bars()
        .to_vec();
    bars[80] = Bar {
        low: 100.0,
        close: ENTRY,
        open: ENTRY,
        high: ENTRY + 1.0,
        ..bars[80].clone()
    };
    // 95.95 / 101 - 1 = -5%, and the series stays there so nothing re-fires
    for b in bars.iter_mut().skip(90) {
        *b = Bar {
            low: 95.0,
            close: 95.95,
            open: 95.95,
            high: 96.95,
            ..b.clone()
        };
    }
    let series = PriceSeries::new("MIXED", bars).unwrap();
    let frame = IndicatorFrame::build(series, &params);

    // When the rule is replayed
    let summary = run_backtest(&frame, &params);

    // Then one win and one loss net out to zero
    assert_eq!(summary.trade_count(), 2);
    assert!((summary.win_rate_pct().unwrap() - 50.0).abs() < 1e-9);
    assert!(summary.average_return_pct().unwrap().abs() < 1e-9);
}
