//! Evidence bundle: everything known about one triggered asset.
//!
//! The bundle is the single input to the advisory prompt, the fallback
//! message and the mail body, so all three describe the same numbers.

use chrono::NaiveDate;
use dipwatch_core::backtest::BacktestSummary;
use dipwatch_core::data::Headline;
use dipwatch_core::indicators::IndicatorFrame;
use dipwatch_core::macro_context::MacroContext;
use dipwatch_core::options::OptionCandidate;
use dipwatch_core::params::StrategyParams;
use dipwatch_core::signal::SignalResult;
use serde::{Deserialize, Serialize};

/// One bar of the chart window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub short_ma: f64,
    pub long_ma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub signal: SignalResult,
    pub backtest: BacktestSummary,
    pub option: Option<OptionCandidate>,
    pub macro_context: MacroContext,
    pub headlines: Vec<Headline>,
    pub chart: Vec<ChartPoint>,
    pub params: StrategyParams,
}

impl EvidenceBundle {
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        frame: &IndicatorFrame,
        signal: SignalResult,
        backtest: BacktestSummary,
        option: Option<OptionCandidate>,
        macro_context: MacroContext,
        headlines: Vec<Headline>,
        params: StrategyParams,
        chart_window: usize,
    ) -> Self {
        Self {
            signal,
            backtest,
            option,
            macro_context,
            headlines,
            chart: chart_window_of(frame, chart_window),
            params,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.signal.symbol
    }

    /// Prompt for the advisory model. Asks for `{"subject", "body"}` JSON.
    pub fn prompt(&self) -> String {
        let s = &self.signal.snapshot;
        let p = &self.params;
        let m = &self.macro_context;

        let mut out = String::new();
        out.push_str("You are a quantitative portfolio manager reviewing a trade alert.\n\n");
        out.push_str("STRATEGY: mean reversion inside an uptrend.\n");
        out.push_str(&format!(
            "1. {sym} closes above its {long}-day moving average (long-term uptrend).\n\
             2. {sym} has pulled back to within {thr:.1}% of its {short}-day moving average.\n\n",
            sym = self.symbol(),
            long = p.long_window,
            short = p.short_window,
            thr = p.proximity_threshold * 100.0,
        ));

        out.push_str("DATA:\n");
        out.push_str(&format!("- Date: {}\n", s.date));
        out.push_str(&format!("- Price: ${:.2}\n", s.price));
        out.push_str(&format!(
            "- MA{}: ${:.2} (gap {:.2}%)\n",
            p.short_window,
            s.short_ma,
            self.signal.percent_gap_to_short_ma * 100.0
        ));
        out.push_str(&format!("- MA{}: ${:.2}\n", p.long_window, s.long_ma));
        out.push_str(&format!("- RSI({}): {:.1}\n", p.rsi_window, s.rsi));
        match s.historical_volatility {
            Some(hv) => out.push_str(&format!(
                "- Annualized volatility: {:.1}%\n",
                hv * 100.0
            )),
            None => out.push_str("- Annualized volatility: unavailable\n"),
        }
        out.push_str(&format!(
            "- Backtest: {}\n",
            self.backtest.describe(p.holding_period)
        ));
        if m.is_available() {
            out.push_str(&format!(
                "- Macro: VIX {:.2}, 10Y yield {:.2}%, regime {}\n",
                m.vix_level, m.ten_year_yield, m.regime
            ));
        } else {
            out.push_str("- Macro: unavailable\n");
        }
        match &self.option {
            Some(o) => out.push_str(&format!(
                "- Call idea: {} strike {:.2}, {} days, last ${:.2}, IV {:.1}%, volume {}\n",
                o.expiration,
                o.strike,
                o.days_to_expiry,
                o.last_price,
                o.implied_volatility * 100.0,
                o.volume
            )),
            None => out.push_str("- Call idea: none available\n"),
        }

        out.push_str("\nNEWS HEADLINES:\n");
        if self.headlines.is_empty() {
            out.push_str("- none found\n");
        }
        for h in &self.headlines {
            out.push_str(&format!("- {}\n", h.title));
        }

        out.push_str(
            "\nTASK:\nCheck the headlines for any fundamental reason the pullback could \
             continue. If the news is neutral or positive treat this as a buy signal, \
             otherwise recommend caution.\n\n\
             Return JSON ONLY, with HTML in the body:\n\
             {\"subject\": \"...\", \"body\": \"...\"}\n",
        );
        out
    }

    /// Headline list as HTML, or a "no news" paragraph.
    pub fn sources_html(&self) -> String {
        if self.headlines.is_empty() {
            return "<p>No recent news found.</p>".to_string();
        }
        let items: String = self
            .headlines
            .iter()
            .map(|h| {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(&h.link),
                    escape_html(&h.title)
                )
            })
            .collect();
        format!("<ul>{items}</ul>")
    }

    /// Advisory body followed by the sources section.
    pub fn mail_body(&self, advice_body: &str) -> String {
        format!(
            "{advice_body}<br><hr><strong>Sources:</strong><br>{}",
            self.sources_html()
        )
    }
}

fn chart_window_of(frame: &IndicatorFrame, window: usize) -> Vec<ChartPoint> {
    let tail = frame.series().tail(window);
    let start = frame.bars().len() - tail.len();
    let (short, long) = (frame.short_ma(), frame.long_ma());
    tail.iter()
        .zip(start..)
        .map(|(bar, i)| ChartPoint {
            date: bar.date,
            close: bar.close,
            short_ma: short.get(i).copied().unwrap_or(f64::NAN),
            long_ma: long.get(i).copied().unwrap_or(f64::NAN),
        })
        .collect()
}

/// Escape text for inclusion in HTML element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
