//! Call option candidate selection.
//!
//! Picks an expiration 30–60 days out (falling back to the nearest listed one)
//! and the call whose strike is closest to 2% above the underlying price.
//! Assets without listed options simply get no candidate.

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::provider::OptionsSource;

/// Preferred days-to-expiry window.
pub const TARGET_DTE: RangeInclusive<i64> = 30..=60;

/// Target strike as a multiple of the underlying price.
pub const STRIKE_BIAS: f64 = 1.02;

/// One row of a call chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRow {
    pub strike: f64,
    pub last_price: f64,
    pub implied_volatility: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCandidate {
    pub expiration: NaiveDate,
    pub days_to_expiry: i64,
    pub strike: f64,
    pub last_price: f64,
    pub implied_volatility: f64,
    pub volume: u64,
}

/// Nearest expiration inside [`TARGET_DTE`], else the nearest unexpired one.
pub fn select_expiration(expirations: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    let upcoming = || {
        expirations
            .iter()
            .copied()
            .map(move |e| (e, (e - today).num_days()))
            .filter(|(_, days)| *days >= 0)
    };

    upcoming()
        .filter(|(_, days)| TARGET_DTE.contains(days))
        .min_by_key(|(_, days)| *days)
        .or_else(|| upcoming().min_by_key(|(_, days)| *days))
        .map(|(e, _)| e)
}

/// Call with the strike closest to `underlying_price * STRIKE_BIAS`.
/// Equal distances resolve to the lower strike.
pub fn select_call(chain: &[OptionRow], underlying_price: f64) -> Option<&OptionRow> {
    let target = underlying_price * STRIKE_BIAS;
    chain
        .iter()
        .filter(|row| row.strike.is_finite())
        .min_by(|a, b| {
            let da = (a.strike - target).abs();
            let db = (b.strike - target).abs();
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.strike.partial_cmp(&b.strike).unwrap_or(Ordering::Equal))
        })
}

/// Query the source and pick a candidate. Source errors become `None`.
pub fn find_candidate(
    source: &dyn OptionsSource,
    symbol: &str,
    underlying_price: f64,
    today: NaiveDate,
) -> Option<OptionCandidate> {
    let expirations = match source.list_expirations(symbol) {
        Ok(e) => e,
        Err(e) => {
            debug!(symbol, error = %e, "no option expirations");
            return None;
        }
    };
    let expiration = select_expiration(&expirations, today)?;

    let chain = match source.fetch_calls(symbol, expiration) {
        Ok(c) => c,
        Err(e) => {
            debug!(symbol, %expiration, error = %e, "no call chain");
            return None;
        }
    };
    let row = select_call(&chain, underlying_price)?;

    Some(OptionCandidate {
        expiration,
        days_to_expiry: (expiration - today).num_days(),
        strike: row.strike,
        last_price: row.last_price,
        implied_volatility: row.implied_volatility,
        volume: row.volume,
    })
}
