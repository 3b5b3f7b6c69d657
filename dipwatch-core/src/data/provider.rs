//! Collaborator traits and structured error types.
//!
//! The scanner only sees market data through these traits, so the Yahoo client
//! can be swapped for synthetic or in-memory sources in offline runs and tests.

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceSeries;
use crate::options::OptionRow;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {provider} for {symbol}")]
    HttpStatus {
        provider: &'static str,
        symbol: String,
        status: u16,
    },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider blocked requests, circuit breaker open for {remaining_secs}s")]
    CircuitBreakerOpen { remaining_secs: u64 },

    #[error("no usable close for {symbol}")]
    NoClose { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// A history window such as `5d`, `6mo` or `2y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Lookback {
    Days(u32),
    Months(u32),
    Years(u32),
}

impl Lookback {
    /// First calendar date covered when the window ends on `end`.
    pub fn start_from(self, end: NaiveDate) -> NaiveDate {
        let shifted = match self {
            Lookback::Days(d) => end.checked_sub_days(chrono::Days::new(u64::from(d))),
            Lookback::Months(m) => end.checked_sub_months(Months::new(m)),
            Lookback::Years(y) => end.checked_sub_months(Months::new(y.saturating_mul(12))),
        };
        shifted.unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Days(d) => write!(f, "{d}d"),
            Lookback::Months(m) => write!(f, "{m}mo"),
            Lookback::Years(y) => write!(f, "{y}y"),
        }
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("lookback '{s}' has no unit (use d, mo or y)"))?;
        let (num, unit) = s.split_at(split);
        let n: u32 = num
            .parse()
            .map_err(|_| format!("lookback '{s}' must start with a number"))?;
        if n == 0 {
            return Err(format!("lookback '{s}' must be positive"));
        }
        match unit {
            "d" => Ok(Lookback::Days(n)),
            "mo" => Ok(Lookback::Months(n)),
            "y" => Ok(Lookback::Years(n)),
            other => Err(format!("unknown lookback unit '{other}' (use d, mo or y)")),
        }
    }
}

impl TryFrom<String> for Lookback {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.to_string()
    }
}

/// A news headline attached to a triggered signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub link: String,
}

/// Maximum headlines carried per asset.
pub const MAX_HEADLINES: usize = 3;

/// Daily price history by symbol.
///
/// Empty or short series are valid results; the detector decides whether
/// there is enough history.
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_history(&self, symbol: &str, lookback: Lookback) -> Result<PriceSeries, DataError>;
}

/// Recent headlines for a symbol, at most [`MAX_HEADLINES`].
pub trait HeadlineSource: Send + Sync {
    fn fetch_headlines(&self, symbol: &str) -> Result<Vec<Headline>, DataError>;
}

/// Listed option expirations and call chains.
pub trait OptionsSource: Send + Sync {
    fn list_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError>;

    fn fetch_calls(&self, symbol: &str, expiration: NaiveDate)
        -> Result<Vec<OptionRow>, DataError>;
}

/// Latest defined close of a short history, used for macro series like ^VIX.
pub fn latest_close(
    source: &dyn PriceSource,
    symbol: &str,
    lookback: Lookback,
) -> Result<f64, DataError> {
    let series = source.fetch_history(symbol, lookback)?;
    series
        .bars()
        .iter()
        .rev()
        .map(|b| b.close)
        .find(|c| c.is_finite())
        .ok_or_else(|| DataError::NoClose {
            symbol: symbol.to_string(),
        })
}
