//! Strategy parameters for the dip-in-uptrend rule.
//!
//! One parameter struct replaces the per-version constants the scanner grew
//! over time; the historical variants survive as named presets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("short window ({short}) must be smaller than long window ({long})")]
    WindowOrder { short: usize, long: usize },
    #[error("RSI window ({rsi}) must be smaller than long window ({long})")]
    RsiWindow { rsi: usize, long: usize },
    #[error("{name} must be >= {min}, got {value}")]
    TooSmall {
        name: &'static str,
        min: usize,
        value: usize,
    },
    #[error("proximity threshold must be a finite non-negative fraction, got {0}")]
    BadThreshold(f64),
    #[error("unknown strategy preset '{0}'")]
    UnknownPreset(String),
}

/// Window sizes, trigger threshold and holding period shared by the live
/// detector and the backtest replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// The "dip" moving average the price should be pulling back to.
    pub short_window: usize,
    /// The trend filter: price must sit above this moving average.
    pub long_window: usize,
    /// Maximum |price − short MA| / short MA, as a fraction (0.02 = 2%).
    pub proximity_threshold: f64,
    pub rsi_window: usize,
    pub volatility_window: usize,
    /// Bars held after a historical trigger before measuring the return.
    pub holding_period: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyPreset::Ma60Dip.params()
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let minimums = [
            ("short_window", 1, self.short_window),
            ("long_window", 2, self.long_window),
            ("rsi_window", 1, self.rsi_window),
            ("volatility_window", 2, self.volatility_window),
            ("holding_period", 1, self.holding_period),
        ];
        for (name, min, value) in minimums {
            if value < min {
                return Err(ParamsError::TooSmall { name, min, value });
            }
        }
        if self.short_window >= self.long_window {
            return Err(ParamsError::WindowOrder {
                short: self.short_window,
                long: self.long_window,
            });
        }
        if self.rsi_window >= self.long_window {
            return Err(ParamsError::RsiWindow {
                rsi: self.rsi_window,
                long: self.long_window,
            });
        }
        if !self.proximity_threshold.is_finite() || self.proximity_threshold < 0.0 {
            return Err(ParamsError::BadThreshold(self.proximity_threshold));
        }
        Ok(())
    }

    /// Minimum number of bars before the detector may evaluate: the long MA
    /// window, or the RSI warmup (`rsi_window` deltas) if that is longer.
    pub fn required_history(&self) -> usize {
        self.long_window.max(self.rsi_window + 1)
    }
}

/// Named parameter sets, one per scanner generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    /// Price within 1.5% of the 120-day MA, above the 200-day MA.
    Ma120Touch,
    /// Price within 2% of the 60-day MA, above the 200-day MA.
    Ma60Dip,
    /// Price within 2.5% of the 60-day MA, above the 200-day MA.
    Ma60DipWide,
}

impl StrategyPreset {
    pub const ALL: [StrategyPreset; 3] = [
        StrategyPreset::Ma120Touch,
        StrategyPreset::Ma60Dip,
        StrategyPreset::Ma60DipWide,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyPreset::Ma120Touch => "ma120_touch",
            StrategyPreset::Ma60Dip => "ma60_dip",
            StrategyPreset::Ma60DipWide => "ma60_dip_wide",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ParamsError> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| ParamsError::UnknownPreset(name.to_string()))
    }

    pub fn params(self) -> StrategyParams {
        let (short_window, proximity_threshold) = match self {
            StrategyPreset::Ma120Touch => (120, 0.015),
            StrategyPreset::Ma60Dip => (60, 0.02),
            StrategyPreset::Ma60DipWide => (60, 0.025),
        };
        StrategyParams {
            short_window,
            long_window: 200,
            proximity_threshold,
            rsi_window: 14,
            volatility_window: 252,
            holding_period: 10,
        }
    }
}
