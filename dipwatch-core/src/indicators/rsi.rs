//! Relative Strength Index (RSI), simple-average variant.
//!
//! Average gain and average loss are plain trailing means of the last
//! `window` close-to-close deltas (no Wilder smoothing).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: window. avg_loss == 0 → RSI = 100, including a flat window.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    name: String,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "RSI window must be >= 1");
        Self {
            window,
            name: format!("rsi_{window}"),
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
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

        // deltas[i] is the change from bar i-1 to bar i; deltas[0] is undefined
        let deltas: Vec<f64> = (0..n)
            .map(|i| {
                if i == 0 {
                    f64::NAN
                } else {
                    bars[i].close - bars[i - 1].close
                }
            })
            .collect();

        for i in self.window..n {
            let window = &deltas[(i + 1 - self.window)..=i];
            if window.iter().any(|d| !d.is_finite()) {
                continue;
            }
            let gains: f64 = window.iter().filter(|d| **d > 0.0).sum();
            let losses: f64 = window.iter().filter(|d| **d < 0.0).map(|d| -d).sum();
            let len = self.window as f64;
            result[i] = rsi_from_averages(gains / len, losses / len);
        }

        result
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return 100.0;
    }
    let rsi = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    rsi.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 100.0, 1e-9);
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_all_losses() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_flat_window_is_100() {
        let bars = make_bars(&[50.0, 50.0, 50.0, 50.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 100.0, 1e-9);
    }

    #[test]
    fn rsi_mixed_uses_simple_means() {
        // Deltas: +0.34, -0.25, -0.48, +0.72
        // Window at index 3: gains 0.34, losses 0.73
        // RSI = 100 - 100/(1 + 0.34/0.73)
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).compute(&bars);

        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
        // Window at index 4 drops +0.34: gains 0.72, losses 0.73
        assert_approx(result[4], 100.0 - 100.0 / (1.0 + 0.72 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_recovers_after_nan() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0]);
        bars[2].close = f64::NAN;
        let result = Rsi::new(2).compute(&bars);
        // Deltas 2 and 3 are undefined, so windows ending at 2, 3 and 4 are too
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_too_few_bars() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let result = Rsi::new(3).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::default().lookback(), 14);
        assert_eq!(Rsi::default().name(), "rsi_14");
    }
}
