//! Indicator library.
//!
//! Indicators are pure functions: bar history in, numeric series out. Every
//! output has the same length as the input with `f64::NAN` wherever the value
//! is undefined (warmup, or a missing close inside the window). They are
//! computed once per asset and attached to the series as named columns.

pub mod sma;
pub mod rsi;
pub mod volatility;

pub use rsi::Rsi;
pub use sma::Sma;
pub use volatility::HistoricalVolatility;

use std::collections::HashMap;

use crate::domain::{Bar, PriceSeries};
use crate::params::StrategyParams;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Column name (e.g. "sma_60", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading bars that are always undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Named indicator columns, indexed by bar.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Last value of a column, `None` if missing or undefined (NaN).
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.last().copied())
            .filter(|v| !v.is_nan())
    }
}

/// A price series together with the indicator columns the strategy needs.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    series: PriceSeries,
    columns: IndicatorValues,
    short_key: String,
    long_key: String,
    rsi_key: String,
    volatility_key: String,
}

impl IndicatorFrame {
    pub fn build(series: PriceSeries, params: &StrategyParams) -> Self {
        let short = Sma::new(params.short_window);
        let long = Sma::new(params.long_window);
        let rsi = Rsi::new(params.rsi_window);
        let hv = HistoricalVolatility::new(params.volatility_window);
        let indicators: [&dyn Indicator; 4] = [&short, &long, &rsi, &hv];

        let mut columns = IndicatorValues::new();
        for indicator in indicators {
            columns.insert(indicator.name(), indicator.compute(series.bars()));
        }

        Self {
            series,
            columns,
            short_key: short.name().to_string(),
            long_key: long.name().to_string(),
            rsi_key: rsi.name().to_string(),
            volatility_key: hv.name().to_string(),
        }
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn bars(&self) -> &[Bar] {
        self.series.bars()
    }

    pub fn short_ma(&self) -> &[f64] {
        self.columns.get_series(&self.short_key).unwrap_or(&[])
    }

    pub fn long_ma(&self) -> &[f64] {
        self.columns.get_series(&self.long_key).unwrap_or(&[])
    }

    pub fn latest_short_ma(&self) -> Option<f64> {
        self.columns.latest(&self.short_key)
    }

    pub fn latest_long_ma(&self) -> Option<f64> {
        self.columns.latest(&self.long_key)
    }

    pub fn latest_rsi(&self) -> Option<f64> {
        self.columns.latest(&self.rsi_key)
    }

    pub fn latest_volatility(&self) -> Option<f64> {
        self.columns.latest(&self.volatility_key)
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low one point outside
/// the body, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
