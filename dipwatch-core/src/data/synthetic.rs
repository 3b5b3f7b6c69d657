//! Deterministic synthetic market data for offline scans.
//!
//! Produces a random walk with a mild upward drift, seeded from the BLAKE3 hash
//! of the symbol so repeated runs see identical bars. Index symbols (those
//! starting with `^`) start near 18 so macro readings land in a plausible range.
//! There are no synthetic headlines or option listings.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{
    DataError, Headline, HeadlineSource, Lookback, OptionsSource, PriceSource,
};
use crate::domain::{Bar, PriceSeries};
use crate::options::OptionRow;

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    end: NaiveDate,
}

impl SyntheticSource {
    /// Series end on `end` (inclusive).
    pub fn new(end: NaiveDate) -> Self {
        Self { end }
    }

    pub fn generate(&self, symbol: &str, lookback: Lookback) -> Vec<Bar> {
        generate_bars(symbol, lookback.start_from(self.end), self.end)
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_history(&self, symbol: &str, lookback: Lookback) -> Result<PriceSeries, DataError> {
        PriceSeries::new(symbol, self.generate(symbol, lookback))
            .map_err(|e| DataError::Other(e.to_string()))
    }
}

impl HeadlineSource for SyntheticSource {
    fn fetch_headlines(&self, _symbol: &str) -> Result<Vec<Headline>, DataError> {
        Ok(Vec::new())
    }
}

impl OptionsSource for SyntheticSource {
    fn list_expirations(&self, _symbol: &str) -> Result<Vec<NaiveDate>, DataError> {
        Ok(Vec::new())
    }

    fn fetch_calls(&self, _symbol: &str, _expiration: NaiveDate) -> Result<Vec<OptionRow>, DataError> {
        Ok(Vec::new())
    }
}

/// Weekday-only random walk between `start` and `end`.
pub fn generate_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let is_index = symbol.starts_with('^');
    let mut price = if is_index { 18.0 } else { 100.0_f64 };
    let mut bars = Vec::new();
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.02..0.022);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
