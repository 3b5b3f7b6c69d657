//! Historical replay of the dip-in-uptrend rule.
//!
//! Every past bar that satisfies the trigger becomes a hypothetical entry at
//! its close; the exit is the close `holding_period` bars later. The historical
//! "touch" test uses the session low, `low <= short_ma * (1 + threshold)`,
//! so the replay is more permissive than the live close-based detector.
//!
//! No look-ahead: an entry whose exit bar does not exist yet is discarded,
//! never truncated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorFrame;
use crate::params::StrategyParams;

/// One replayed entry/exit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_close: f64,
    pub exit_close: f64,
    /// Simple return as a fraction.
    pub return_frac: f64,
}

/// Aggregate replay statistics.
///
/// `InsufficientEvidence` means the rule never fired with a complete holding
/// window. It is not the same as a losing record and must not be shown as 0%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestSummary {
    Trades {
        trade_count: usize,
        win_rate_pct: f64,
        average_return_pct: f64,
    },
    InsufficientEvidence,
}

impl BacktestSummary {
    pub fn from_trades(trades: &[BacktestTrade]) -> Self {
        if trades.is_empty() {
            return BacktestSummary::InsufficientEvidence;
        }
        let n = trades.len() as f64;
        let wins = trades.iter().filter(|t| t.return_frac > 0.0).count();
        let mean = trades.iter().map(|t| t.return_frac).sum::<f64>() / n;
        BacktestSummary::Trades {
            trade_count: trades.len(),
            win_rate_pct: wins as f64 / n * 100.0,
            average_return_pct: mean * 100.0,
        }
    }

    pub fn trade_count(&self) -> usize {
        match self {
            BacktestSummary::Trades { trade_count, .. } => *trade_count,
            BacktestSummary::InsufficientEvidence => 0,
        }
    }

    /// `None` when there were no trades.
    pub fn win_rate_pct(&self) -> Option<f64> {
        match self {
            BacktestSummary::Trades { win_rate_pct, .. } => Some(*win_rate_pct),
            BacktestSummary::InsufficientEvidence => None,
        }
    }

    pub fn average_return_pct(&self) -> Option<f64> {
        match self {
            BacktestSummary::Trades {
                average_return_pct, ..
            } => Some(*average_return_pct),
            BacktestSummary::InsufficientEvidence => None,
        }
    }

    pub fn has_evidence(&self) -> bool {
        matches!(self, BacktestSummary::Trades { .. })
    }

    /// One-line human description used in logs, prompts and fallback mail.
    pub fn describe(&self, holding_period: usize) -> String {
        match self {
            BacktestSummary::Trades {
                trade_count,
                win_rate_pct,
                average_return_pct,
            } => format!(
                "{trade_count} past signals, {win_rate_pct:.1}% win rate, \
                 {average_return_pct:+.2}% average {holding_period}-day return"
            ),
            BacktestSummary::InsufficientEvidence => {
                "insufficient evidence: no completed historical signals".to_string()
            }
        }
    }
}

/// Trades plus summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub holding_period: usize,
    pub trades: Vec<BacktestTrade>,
    pub summary: BacktestSummary,
}

/// Whether bar `i` satisfies the historical trigger.
fn is_historical_trigger(frame: &IndicatorFrame, i: usize, threshold: f64) -> bool {
    let bar = &frame.bars()[i];
    let (short_ma, long_ma) = match (frame.short_ma().get(i), frame.long_ma().get(i)) {
        (Some(&s), Some(&l)) => (s, l),
        _ => return false,
    };
    if !(short_ma.is_finite() && long_ma.is_finite() && bar.close.is_finite()) {
        return false;
    }
    let is_uptrend = bar.close > long_ma;
    let touched = bar.low <= short_ma * (1.0 + threshold);
    is_uptrend && touched
}

/// Replay the rule over the frame and collect completed trades.
pub fn replay(frame: &IndicatorFrame, params: &StrategyParams) -> BacktestReport {
    let bars = frame.bars();
    let hold = params.holding_period;
    let mut trades = Vec::new();

    for i in 0..bars.len() {
        if !is_historical_trigger(frame, i, params.proximity_threshold) {
            continue;
        }
        let Some(exit) = bars.get(i + hold) else {
            continue;
        };
        let entry = &bars[i];
        if !exit.close.is_finite() || entry.close == 0.0 {
            continue;
        }
        trades.push(BacktestTrade {
            entry_date: entry.date,
            exit_date: exit.date,
            entry_close: entry.close,
            exit_close: exit.close,
            return_frac: (exit.close - entry.close) / entry.close,
        });
    }

    let summary = BacktestSummary::from_trades(&trades);
    BacktestReport {
        symbol: frame.series().symbol().to_string(),
        holding_period: hold,
        trades,
        summary,
    }
}

/// Summary-only replay.
pub fn run_backtest(frame: &IndicatorFrame, params: &StrategyParams) -> BacktestSummary {
    replay(frame, params).summary
}
