//! Scan configuration.
//!
//! Non-secret settings live in a TOML file; credentials come from the
//! environment so the file can be committed.

use std::path::Path;
use std::time::Duration;

use dipwatch_core::data::Lookback;
use dipwatch_core::macro_context::MacroSymbols;
use dipwatch_core::params::{ParamsError, StrategyParams, StrategyPreset};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content hash identifying a configuration in logs.
pub type ConfigFingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("watchlist is empty")]
    EmptyWatchlist,
    #[error("environment variable {0} is not set")]
    MissingSecret(&'static str),
}

/// Full configuration for one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub scan: ScanSection,
    pub strategy: StrategySection,
    #[serde(rename = "macro")]
    pub macro_symbols: MacroSymbols,
    pub advisory: AdvisorySection,
    pub mail: MailSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub watchlist: Vec<String>,
    pub lookback: Lookback,
    /// Pause after each triggered asset.
    pub pacing_delay_secs: u64,
    /// Trailing bars included in the evidence bundle.
    pub chart_window: usize,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            watchlist: [
                "AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "NFLX", "VOO", "QQQ", "GLD",
                "BTC-USD",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            lookback: Lookback::Years(2),
            pacing_delay_secs: 4,
            chart_window: 120,
        }
    }
}

/// A preset, optionally with individual fields overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub preset: StrategyPreset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_period: Option<usize>,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            preset: StrategyPreset::Ma60Dip,
            short_window: None,
            long_window: None,
            proximity_threshold: None,
            rsi_window: None,
            volatility_window: None,
            holding_period: None,
        }
    }
}

impl StrategySection {
    /// Preset values with overrides applied, validated.
    pub fn resolve(&self) -> Result<StrategyParams, ParamsError> {
        let base = self.preset.params();
        let params = StrategyParams {
            short_window: self.short_window.unwrap_or(base.short_window),
            long_window: self.long_window.unwrap_or(base.long_window),
            proximity_threshold: self
                .proximity_threshold
                .unwrap_or(base.proximity_threshold),
            rsi_window: self.rsi_window.unwrap_or(base.rsi_window),
            volatility_window: self.volatility_window.unwrap_or(base.volatility_window),
            holding_period: self.holding_period.unwrap_or(base.holding_period),
        };
        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorySection {
    pub model: String,
    pub temperature: f32,
}

impl Default for AdvisorySection {
    fn default() -> Self {
        Self {
            model: "gemini-flash-latest".into(),
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSection {
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 587,
        }
    }
}

impl ScanConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.watchlist.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptyWatchlist);
        }
        self.strategy.resolve()?;
        Ok(())
    }

    pub fn params(&self) -> Result<StrategyParams, ConfigError> {
        Ok(self.strategy.resolve()?)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.scan.pacing_delay_secs)
    }

    /// Deterministic BLAKE3 hash of the serialized configuration.
    ///
    /// Two scans with identical settings log the same fingerprint.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

/// Credentials read from the environment.
///
/// The API key and mail password stay wrapped until the HTTP header or SMTP
/// login that needs them.
#[derive(Debug)]
pub struct Secrets {
    pub gemini_api_key: SecretString,
    pub mail_user: String,
    pub mail_password: SecretString,
    pub target_email: String,
}

impl Secrets {
    pub const GEMINI_API_KEY: &'static str = "GEMINI_API_KEY";
    pub const MAIL_USER: &'static str = "GMAIL_USER";
    pub const MAIL_PASSWORD: &'static str = "GMAIL_PASS";
    pub const TARGET_EMAIL: &'static str = "TARGET_EMAIL";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read secrets through an arbitrary lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingSecret(key))
        };
        Ok(Self {
            gemini_api_key: SecretString::new(get(Self::GEMINI_API_KEY)?.into()),
            mail_user: get(Self::MAIL_USER)?,
            mail_password: SecretString::new(get(Self::MAIL_PASSWORD)?.into()),
            target_email: get(Self::TARGET_EMAIL)?,
        })
    }
}
