//! Annualized historical volatility.
//!
//! Sample standard deviation (n-1) of the trailing `window` daily log returns,
//! multiplied by sqrt(252). Needs `window + 1` bars for the first value.

use super::Indicator;
use crate::domain::Bar;

/// Trading sessions per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct HistoricalVolatility {
    window: usize,
    name: String,
}

impl HistoricalVolatility {
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "volatility window must be >= 2");
        Self {
            window,
            name: format!("hv_{window}"),
        }
    }
}

impl Default for HistoricalVolatility {
    fn default() -> Self {
        Self::new(252)
    }
}

impl Indicator for HistoricalVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.window + 1 {
            return result;
        }

        let log_returns: Vec<f64> = (0..n)
            .map(|i| {
                if i == 0 {
                    return f64::NAN;
                }
                let (prev, curr) = (bars[i - 1].close, bars[i].close);
                if prev > 0.0 && curr > 0.0 {
                    (curr / prev).ln()
                } else {
                    f64::NAN
                }
            })
            .collect();

        for i in self.window..n {
            let window = &log_returns[(i + 1 - self.window)..=i];
            if window.iter().any(|r| !r.is_finite()) {
                continue;
            }
            result[i] = sample_std(window) * TRADING_DAYS.sqrt();
        }

        result
    }
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}
