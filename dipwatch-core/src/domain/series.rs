//! PriceSeries: the chronological bar history of a single symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Bar;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("duplicate bar for {symbol} on {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },
}

/// Ordered daily bars for one symbol over a lookback window.
///
/// Bars are sorted by date with no duplicates. Weekends and holidays are simply
/// absent. The series is never mutated once built; indicator columns live
/// alongside it in an [`IndicatorFrame`](crate::indicators::IndicatorFrame).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, sorting by date and rejecting duplicate sessions.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SeriesError::DuplicateDate {
                symbol,
                date: pair[0].date,
            });
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Number of bars with a defined close.
    pub fn valid_len(&self) -> usize {
        self.bars.iter().filter(|b| !b.close.is_nan()).count()
    }

    /// The trailing `n` bars (or all of them if the series is shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}
