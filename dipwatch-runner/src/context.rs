//! Everything a scan needs, borrowed for the duration of one run.

use chrono::{NaiveDate, Utc};
use dipwatch_core::data::{HeadlineSource, OptionsSource, PriceSource};
use dipwatch_core::params::StrategyParams;

use crate::advisory::Advisor;
use crate::config::{ConfigError, ScanConfig};
use crate::notify::Notifier;
use crate::scan::{Pacer, ThreadSleep};

static THREAD_SLEEP: ThreadSleep = ThreadSleep;

/// Configuration plus collaborators.
///
/// Market data, advisory and delivery are reached only through these trait
/// objects; tests swap in in-memory implementations.
pub struct RunContext<'a> {
    pub config: &'a ScanConfig,
    pub params: StrategyParams,
    pub prices: &'a dyn PriceSource,
    pub headlines: &'a dyn HeadlineSource,
    pub options: &'a dyn OptionsSource,
    pub advisor: &'a dyn Advisor,
    pub notifier: &'a dyn Notifier,
    pub pacer: &'a dyn Pacer,
    /// Reference date for option days-to-expiry.
    pub today: NaiveDate,
}

impl<'a> RunContext<'a> {
    /// Context with real-time pacing and today's UTC date.
    pub fn new(
        config: &'a ScanConfig,
        prices: &'a dyn PriceSource,
        headlines: &'a dyn HeadlineSource,
        options: &'a dyn OptionsSource,
        advisor: &'a dyn Advisor,
        notifier: &'a dyn Notifier,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            params: config.params()?,
            prices,
            headlines,
            options,
            advisor,
            notifier,
            pacer: &THREAD_SLEEP,
            today: Utc::now().date_naive(),
        })
    }

    pub fn with_pacer(mut self, pacer: &'a dyn Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}
