//! Market regime from the volatility index and the 10-year yield.
//!
//! Read once per scan and shared read-only by every asset evaluation. A failed
//! fetch degrades to [`Regime::Error`] instead of aborting the scan.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::provider::{latest_close, DataError, Lookback, PriceSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    Error,
}

impl Regime {
    /// vix > 30 → extreme fear, > 20 → fear, < 15 → greed, otherwise neutral.
    pub fn classify(vix: f64) -> Self {
        if vix > 30.0 {
            Regime::ExtremeFear
        } else if vix > 20.0 {
            Regime::Fear
        } else if vix < 15.0 {
            Regime::Greed
        } else {
            Regime::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Regime::ExtremeFear => "EXTREME_FEAR",
            Regime::Fear => "FEAR",
            Regime::Neutral => "NEUTRAL",
            Regime::Greed => "GREED",
            Regime::Error => "ERROR",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Symbols and window used to read the macro backdrop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroSymbols {
    pub vix_symbol: String,
    pub yield_symbol: String,
    pub lookback: Lookback,
}

impl Default for MacroSymbols {
    fn default() -> Self {
        Self {
            vix_symbol: "^VIX".into(),
            yield_symbol: "^TNX".into(),
            lookback: Lookback::Days(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroContext {
    pub vix_level: f64,
    pub ten_year_yield: f64,
    pub regime: Regime,
}

impl MacroContext {
    pub fn from_levels(vix_level: f64, ten_year_yield: f64) -> Self {
        Self {
            vix_level,
            ten_year_yield,
            regime: Regime::classify(vix_level),
        }
    }

    /// Sentinel context after a failed fetch: zero levels, `Error` regime.
    pub fn unavailable() -> Self {
        Self {
            vix_level: 0.0,
            ten_year_yield: 0.0,
            regime: Regime::Error,
        }
    }

    pub fn is_available(&self) -> bool {
        self.regime != Regime::Error
    }

    /// Fetch both series and classify. Never fails.
    pub fn read(source: &dyn PriceSource, symbols: &MacroSymbols) -> Self {
        match Self::try_read(source, symbols) {
            Ok(ctx) => {
                info!(
                    vix = ctx.vix_level,
                    ten_year_yield = ctx.ten_year_yield,
                    regime = %ctx.regime,
                    "macro context"
                );
                ctx
            }
            Err(e) => {
                warn!(error = %e, "macro context unavailable");
                Self::unavailable()
            }
        }
    }

    fn try_read(source: &dyn PriceSource, symbols: &MacroSymbols) -> Result<Self, DataError> {
        let vix = latest_close(source, &symbols.vix_symbol, symbols.lookback)?;
        let tnx = latest_close(source, &symbols.yield_symbol, symbols.lookback)?;
        Ok(Self::from_levels(vix, tnx))
    }
}
