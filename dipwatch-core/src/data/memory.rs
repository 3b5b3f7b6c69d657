//! In-memory data source for offline runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::provider::{
    DataError, Headline, HeadlineSource, Lookback, OptionsSource, PriceSource, MAX_HEADLINES,
};
use crate::domain::{Bar, PriceSeries};
use crate::options::OptionRow;

/// Fixture-backed source. Unknown symbols behave like unlisted tickers:
/// `SymbolNotFound` for prices, empty headlines and no option expirations.
#[derive(Debug, Default)]
pub struct StaticSource {
    bars: HashMap<String, Vec<Bar>>,
    failing: HashMap<String, String>,
    headlines: HashMap<String, Vec<Headline>>,
    options: HashMap<String, Vec<(NaiveDate, Vec<OptionRow>)>>,
    requests: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    /// Make every price request for `symbol` fail with `reason`.
    pub fn with_failure(mut self, symbol: &str, reason: &str) -> Self {
        self.failing.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_headlines(mut self, symbol: &str, headlines: Vec<Headline>) -> Self {
        self.headlines.insert(symbol.to_string(), headlines);
        self
    }

    pub fn with_options(mut self, symbol: &str, chains: Vec<(NaiveDate, Vec<OptionRow>)>) -> Self {
        self.options.insert(symbol.to_string(), chains);
        self
    }

    /// Symbols requested through `fetch_history`, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl PriceSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_history(&self, symbol: &str, _lookback: Lookback) -> Result<PriceSeries, DataError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(symbol.to_string());
        }
        if let Some(reason) = self.failing.get(symbol) {
            return Err(DataError::NetworkUnreachable(reason.clone()));
        }
        let bars = self
            .bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        PriceSeries::new(symbol, bars).map_err(|e| DataError::Other(e.to_string()))
    }
}

impl HeadlineSource for StaticSource {
    fn fetch_headlines(&self, symbol: &str) -> Result<Vec<Headline>, DataError> {
        Ok(self
            .headlines
            .get(symbol)
            .map(|h| h.iter().take(MAX_HEADLINES).cloned().collect())
            .unwrap_or_default())
    }
}

impl OptionsSource for StaticSource {
    fn list_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError> {
        Ok(self
            .options
            .get(symbol)
            .map(|chains| chains.iter().map(|(d, _)| *d).collect())
            .unwrap_or_default())
    }

    fn fetch_calls(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<Vec<OptionRow>, DataError> {
        Ok(self
            .options
            .get(symbol)
            .and_then(|chains| chains.iter().find(|(d, _)| *d == expiration))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}
