//! Market data collaborators: traits, the Yahoo client and offline sources.

pub mod circuit_breaker;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use memory::StaticSource;
pub use provider::{
    latest_close, DataError, Headline, HeadlineSource, Lookback, OptionsSource, PriceSource,
    MAX_HEADLINES,
};
pub use synthetic::SyntheticSource;
pub use yahoo::YahooClient;
