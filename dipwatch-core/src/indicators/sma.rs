//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a trailing window.
//! Lookback: window - 1 (first valid value at index window-1).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    name: String,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "SMA window must be >= 1");
        Self {
            window,
            name: format!("sma_{window}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling_mean(&closes, self.window)
    }
}

/// Trailing mean over `window` values.
///
/// A window containing any non-finite value is undefined. The running sum only
/// tracks finite values and a count of the missing ones, so the scan stays O(n).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum = 0.0;
    let mut missing = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_finite() {
            sum += entering;
        } else {
            missing += 1;
        }

        if i >= window {
            let leaving = values[i - window];
            if leaving.is_finite() {
                sum -= leaving;
            } else {
                missing -= 1;
            }
        }

        if i + 1 >= window && missing == 0 {
            result[i] = sum / window as f64;
        }
    }

    result
}
