//! Property tests for indicator and rule invariants.
//!
//! Uses proptest to verify:
//! 1. RSI stays within [0, 100] wherever it is defined
//! 2. Windows longer than the series produce nothing but NaN
//! 3. Historical volatility is never negative
//! 4. The detector fires exactly when price > long MA and the gap is within threshold
//! 5. The chosen call strike is the closest one to the biased target
//! 6. Regime classification is monotone in the VIX level

use chrono::{Duration, NaiveDate};
use dipwatch_core::domain::Bar;
use dipwatch_core::indicators::{HistoricalVolatility, Indicator, Rsi, Sma};
use dipwatch_core::macro_context::Regime;
use dipwatch_core::options::{select_call, OptionRow, STRIKE_BIAS};
use dipwatch_core::params::StrategyParams;
use dipwatch_core::signal::{evaluate, IndicatorSnapshot};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..max_len)
}

fn bars_from(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: base + Duration::days(i as i64),
            open: close,
            high: close + 0.5,
            low: (close - 0.5).max(0.01),
            close,
            volume: 1_000,
        })
        .collect()
}

fn snapshot(price: f64, short_ma: f64, long_ma: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        price,
        short_ma,
        long_ma,
        rsi: 50.0,
        historical_volatility: None,
    }
}

proptest! {
    // ── 1. RSI bounds ────────────────────────────────────────────────

    #[test]
    fn rsi_is_bounded(closes in arb_closes(120), window in 1usize..30) {
        let values = Rsi::new(window).compute(&bars_from(&closes));
        prop_assert_eq!(values.len(), closes.len());
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(&v), "rsi out of range: {}", v);
        }
    }

    // ── 2. Warmup ────────────────────────────────────────────────────

    #[test]
    fn short_series_is_all_undefined(closes in arb_closes(40), extra in 0usize..20) {
        let bars = bars_from(&closes);
        let window = closes.len() + 1 + extra;

        prop_assert!(Sma::new(window).compute(&bars).iter().all(|v| v.is_nan()));
        prop_assert!(Rsi::new(window).compute(&bars).iter().all(|v| v.is_nan()));
        prop_assert!(HistoricalVolatility::new(window)
            .compute(&bars)
            .iter()
            .all(|v| v.is_nan()));
    }

    // ── 3. Volatility sign ───────────────────────────────────────────

    #[test]
    fn volatility_is_non_negative(closes in arb_closes(80), window in 2usize..20) {
        let values = HistoricalVolatility::new(window).compute(&bars_from(&closes));
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            prop_assert!(v >= 0.0);
        }
    }

    // ── 4. Detector rule ─────────────────────────────────────────────

    #[test]
    fn detector_matches_rule(
        price in arb_price(),
        short_ma in arb_price(),
        long_ma in arb_price(),
        threshold in 0.0..0.1_f64,
    ) {
        let params = StrategyParams { proximity_threshold: threshold, ..StrategyParams::default() };
        let result = evaluate("PROP", snapshot(price, short_ma, long_ma), &params);

        let gap = ((price - short_ma) / short_ma).abs();
        let expected = price > long_ma && gap <= threshold;
        prop_assert_eq!(result.triggered, expected);
        prop_assert_eq!(result.is_uptrend, price > long_ma);
        prop_assert!(result.percent_gap_to_short_ma >= 0.0);
    }

    // ── 5. Strike selection ──────────────────────────────────────────

    #[test]
    fn chosen_strike_is_closest(
        price in arb_price(),
        strikes in prop::collection::vec(1.0..600.0_f64, 1..25),
    ) {
        let chain: Vec<OptionRow> = strikes
            .iter()
            .map(|&strike| OptionRow { strike, last_price: 1.0, implied_volatility: 0.3, volume: 10 })
            .collect();
        let target = price * STRIKE_BIAS;
        let chosen = select_call(&chain, price).expect("non-empty chain");
        let best = strikes
            .iter()
            .map(|s| (s - target).abs())
            .fold(f64::INFINITY, f64::min);
        prop_assert_eq!((chosen.strike - target).abs(), best);
    }

    // ── 6. Regime ordering ───────────────────────────────────────────

    #[test]
    fn higher_vix_never_reads_calmer(a in 0.0..80.0_f64, b in 0.0..80.0_f64) {
        fn rank(r: Regime) -> u8 {
            match r {
                Regime::Greed => 0,
                Regime::Neutral => 1,
                Regime::Fear => 2,
                Regime::ExtremeFear => 3,
                Regime::Error => u8::MAX,
            }
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(Regime::classify(lo)) <= rank(Regime::classify(hi)));
    }
}
