//! Dip-in-uptrend detector.
//!
//! Evaluates the latest bar of one asset: the price must be above the long
//! moving average (trend intact) and within `proximity_threshold` of the short
//! moving average (pullback entry).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::IndicatorFrame;
use crate::params::StrategyParams;

/// Not enough defined history to evaluate the rule. The asset is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("insufficient history: need {needed} bars, have {available}")]
pub struct InsufficientHistory {
    pub needed: usize,
    pub available: usize,
}

/// Indicator values at the most recent bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub price: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    pub rsi: f64,
    pub historical_volatility: Option<f64>,
}

impl IndicatorSnapshot {
    /// Snapshot of the latest bar.
    ///
    /// Fails when the series is shorter than [`StrategyParams::required_history`]
    /// or when the latest close, either moving average or RSI is undefined.
    /// Volatility may be missing without failing.
    pub fn latest(
        frame: &IndicatorFrame,
        params: &StrategyParams,
    ) -> Result<Self, InsufficientHistory> {
        let series = frame.series();
        let needed = params.required_history();
        let insufficient = || InsufficientHistory {
            needed,
            available: series.valid_len(),
        };

        if series.len() < needed {
            return Err(insufficient());
        }
        let last = series.last().ok_or_else(insufficient)?;
        if !last.close.is_finite() {
            return Err(insufficient());
        }
        let short_ma = frame.latest_short_ma().ok_or_else(insufficient)?;
        let long_ma = frame.latest_long_ma().ok_or_else(insufficient)?;
        let rsi = frame.latest_rsi().ok_or_else(insufficient)?;

        Ok(Self {
            date: last.date,
            price: last.close,
            short_ma,
            long_ma,
            rsi,
            historical_volatility: frame.latest_volatility(),
        })
    }
}

/// Outcome of the rule for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub symbol: String,
    pub triggered: bool,
    pub snapshot: IndicatorSnapshot,
    pub is_uptrend: bool,
    pub percent_gap_to_short_ma: f64,
    pub proximity_threshold: f64,
}

/// Coarse classification used for status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Triggered,
    /// Near the short MA but below the long MA.
    Downtrend,
    NoSignal,
}

impl SignalResult {
    pub fn is_near_short_ma(&self) -> bool {
        self.percent_gap_to_short_ma <= self.proximity_threshold
    }

    pub fn verdict(&self) -> Verdict {
        if self.triggered {
            Verdict::Triggered
        } else if self.is_near_short_ma() && !self.is_uptrend {
            Verdict::Downtrend
        } else {
            Verdict::NoSignal
        }
    }
}

/// Apply the dip-in-uptrend rule to a snapshot.
pub fn evaluate(
    symbol: &str,
    snapshot: IndicatorSnapshot,
    params: &StrategyParams,
) -> SignalResult {
    let is_uptrend = snapshot.price > snapshot.long_ma;
    let percent_gap_to_short_ma = percent_gap(snapshot.price, snapshot.short_ma);
    let triggered = is_uptrend && percent_gap_to_short_ma <= params.proximity_threshold;

    SignalResult {
        symbol: symbol.to_string(),
        triggered,
        snapshot,
        is_uptrend,
        percent_gap_to_short_ma,
        proximity_threshold: params.proximity_threshold,
    }
}

/// |price − ma| / ma, always non-negative.
pub fn percent_gap(price: f64, ma: f64) -> f64 {
    ((price - ma) / ma).abs()
}

/// Build the frame's snapshot and evaluate it in one step.
pub fn detect(
    frame: &IndicatorFrame,
    params: &StrategyParams,
) -> Result<SignalResult, InsufficientHistory> {
    let snapshot = IndicatorSnapshot::latest(frame, params)?;
    Ok(evaluate(frame.series().symbol(), snapshot, params))
}
