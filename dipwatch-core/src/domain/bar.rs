//! Bar: one trading session of one asset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar.
///
/// Missing provider fields arrive as `f64::NAN`; indicators treat a NaN close
/// as "undefined at this bar" rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// True when at least one of open, high, low or close is missing.
    pub fn is_void(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .any(|p| p.is_nan())
    }

    /// False when the prices that are present contradict each other: a
    /// non-positive price, or an open or close outside the session range.
    /// Missing fields are not held against the bar.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|&p| p <= 0.0) {
            return false;
        }
        if self.low.is_nan() || self.high.is_nan() {
            return true;
        }
        let in_range = |p: f64| p.is_nan() || (self.low..=self.high).contains(&p);
        self.low <= self.high && in_range(self.open) && in_range(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            open,
            high,
            low,
            close,
            volume: 12_000,
        }
    }

    #[test]
    fn ordinary_session_is_consistent() {
        let bar = session(50.0, 52.0, 49.5, 51.0);
        assert!(!bar.is_void());
        assert!(bar.is_consistent());
    }

    #[test]
    fn missing_close_is_void_but_not_contradictory() {
        let bar = session(50.0, 52.0, 49.5, f64::NAN);
        assert!(bar.is_void());
        assert!(bar.is_consistent());
    }

    #[test]
    fn inverted_range_and_zero_price_are_rejected() {
        assert!(!session(50.0, 49.0, 51.0, 50.0).is_consistent());
        assert!(!session(50.0, 52.0, 49.5, 0.0).is_consistent());
        assert!(!session(50.0, 52.0, 49.5, 53.0).is_consistent());
    }
}
