//! Dipwatch Core: domain types, indicators, signal rule, backtest and data sources.
//!
//! This crate holds everything that does not talk to a person:
//! - Daily bars and price series
//! - SMA, simple-mean RSI and annualized historical volatility
//! - The dip-in-uptrend rule and its 10-bar replay backtest
//! - Macro regime reading from the VIX and 10-year yield
//! - Call option candidate selection
//! - Market data traits with Yahoo, synthetic and in-memory sources

pub mod backtest;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod macro_context;
pub mod options;
pub mod params;
pub mod signal;
