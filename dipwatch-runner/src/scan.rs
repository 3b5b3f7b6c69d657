//! Scan orchestrator.
//!
//! Reads the macro context once, then walks the watchlist in order. Each asset
//! ends in exactly one [`AssetOutcome`]; nothing that happens to one asset
//! stops the scan.

use std::time::Duration;

use dipwatch_core::backtest::{run_backtest, BacktestSummary};
use dipwatch_core::data::MAX_HEADLINES;
use dipwatch_core::indicators::IndicatorFrame;
use dipwatch_core::macro_context::MacroContext;
use dipwatch_core::options::{find_candidate, OptionCandidate};
use dipwatch_core::signal::{detect, SignalResult, Verdict};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::advisory::advise_or_fallback;
use crate::context::RunContext;
use crate::evidence::EvidenceBundle;

/// Waits between triggered assets to stay under upstream rate limits.
pub trait Pacer: Send + Sync {
    fn pause(&self, delay: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// What happened to one watchlist entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetOutcome {
    Triggered {
        signal: SignalResult,
        backtest: BacktestSummary,
        option: Option<OptionCandidate>,
        /// False when the notifier failed; the signal is still reported.
        delivered: bool,
    },
    NoSignal {
        signal: SignalResult,
    },
    /// Near the short MA but below the long MA.
    Filtered {
        signal: SignalResult,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReport {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: AssetOutcome,
}

/// Result of one pass over the watchlist, in watchlist order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub fingerprint: String,
    pub macro_context: MacroContext,
    pub assets: Vec<AssetReport>,
}

impl ScanReport {
    fn count(&self, pred: impl Fn(&AssetOutcome) -> bool) -> usize {
        self.assets.iter().filter(|a| pred(&a.outcome)).count()
    }

    pub fn triggered(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Triggered { .. }))
    }

    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Triggered { delivered: true, .. }))
    }

    pub fn filtered(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Filtered { .. }))
    }

    pub fn no_signal(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::NoSignal { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Failed { .. }))
    }

    pub fn outcome(&self, symbol: &str) -> Option<&AssetOutcome> {
        self.assets
            .iter()
            .find(|a| a.symbol == symbol)
            .map(|a| &a.outcome)
    }
}

pub struct Scanner<'a> {
    ctx: &'a RunContext<'a>,
}

impl<'a> Scanner<'a> {
    pub fn new(ctx: &'a RunContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn run(&self) -> ScanReport {
        let config = self.ctx.config;
        let fingerprint = config.fingerprint();
        info!(
            fingerprint = %&fingerprint[..12],
            assets = config.scan.watchlist.len(),
            short_window = self.ctx.params.short_window,
            long_window = self.ctx.params.long_window,
            threshold = self.ctx.params.proximity_threshold,
            "starting dip-in-uptrend scan"
        );

        let macro_context = MacroContext::read(self.ctx.prices, &config.macro_symbols);

        let assets = config
            .scan
            .watchlist
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|symbol| AssetReport {
                symbol: symbol.to_string(),
                outcome: self.scan_asset(symbol, &macro_context),
            })
            .collect();

        let report = ScanReport {
            fingerprint,
            macro_context,
            assets,
        };
        info!(
            triggered = report.triggered(),
            delivered = report.delivered(),
            filtered = report.filtered(),
            no_signal = report.no_signal(),
            skipped = report.skipped(),
            failed = report.failed(),
            "scan complete"
        );
        report
    }

    /// Run the full pipeline for one symbol.
    pub fn scan_asset(&self, symbol: &str, macro_context: &MacroContext) -> AssetOutcome {
        let ctx = self.ctx;
        let params = &ctx.params;

        let series = match ctx.prices.fetch_history(symbol, ctx.config.scan.lookback) {
            Ok(series) => series,
            Err(e) => {
                error!(symbol, error = %e, "price fetch failed");
                return AssetOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let frame = IndicatorFrame::build(series, params);
        let signal = match detect(&frame, params) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(symbol, error = %e, "skipping");
                return AssetOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let s = &signal.snapshot;
        info!(
            symbol,
            price = format!("{:.2}", s.price),
            short_ma = format!("{:.2}", s.short_ma),
            long_ma = format!("{:.2}", s.long_ma),
            gap_pct = format!("{:.2}", signal.percent_gap_to_short_ma * 100.0),
            rsi = format!("{:.1}", s.rsi),
            hv_pct = s.historical_volatility.map(|hv| format!("{:.1}", hv * 100.0)),
            trend = if signal.is_uptrend { "UP" } else { "DOWN" },
            "evaluated"
        );

        match signal.verdict() {
            Verdict::NoSignal => {
                info!(symbol, "no signal");
                AssetOutcome::NoSignal { signal }
            }
            Verdict::Downtrend => {
                info!(
                    symbol,
                    short_window = params.short_window,
                    long_window = params.long_window,
                    "filtered: near short MA but in a downtrend"
                );
                AssetOutcome::Filtered { signal }
            }
            Verdict::Triggered => {
                let outcome = self.handle_trigger(&frame, signal, macro_context);
                ctx.pacer.pause(ctx.config.pacing_delay());
                outcome
            }
        }
    }

    fn handle_trigger(
        &self,
        frame: &IndicatorFrame,
        signal: SignalResult,
        macro_context: &MacroContext,
    ) -> AssetOutcome {
        let ctx = self.ctx;
        let params = ctx.params;
        let symbol = signal.symbol.clone();
        info!(symbol = %symbol, "signal found: uptrend pullback to short MA");

        let backtest = run_backtest(frame, &params);
        info!(
            symbol = %symbol,
            evidence = backtest.has_evidence(),
            backtest = %backtest.describe(params.holding_period),
            "backtest"
        );

        let option = find_candidate(ctx.options, &symbol, signal.snapshot.price, ctx.today);

        let headlines = match ctx.headlines.fetch_headlines(&symbol) {
            Ok(mut h) => {
                h.truncate(MAX_HEADLINES);
                h
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "headline fetch failed");
                Vec::new()
            }
        };

        let bundle = EvidenceBundle::assemble(
            frame,
            signal.clone(),
            backtest,
            option.clone(),
            *macro_context,
            headlines,
            params,
            ctx.config.scan.chart_window,
        );
        let advice = advise_or_fallback(ctx.advisor, &bundle);
        let body = bundle.mail_body(&advice.body);

        let delivered = match ctx.notifier.send(&advice.subject, &body, None) {
            Ok(()) => true,
            Err(e) => {
                error!(symbol = %symbol, error = %e, "notification failed");
                false
            }
        };

        AssetOutcome::Triggered {
            signal,
            backtest,
            option,
            delivered,
        }
    }
}
