//! Dipwatch Runner: scan orchestration on top of `dipwatch-core`.
//!
//! This crate provides:
//! - TOML scan configuration and environment secrets
//! - The run context binding configuration to collaborators
//! - Evidence bundles and the advisory prompt
//! - Gemini advisory client with a deterministic fallback
//! - SMTP and log-only notifiers
//! - The watchlist scanner and its per-asset outcomes

pub mod advisory;
pub mod config;
pub mod context;
pub mod evidence;
pub mod notify;
pub mod scan;

pub use advisory::{
    advise_or_fallback, parse_advice, Advice, AdvisoryError, Advisor, GeminiAdvisor, NoAdvisor,
};
pub use config::{ConfigError, ScanConfig, Secrets};
pub use context::RunContext;
pub use evidence::{ChartPoint, EvidenceBundle};
pub use notify::{LogNotifier, Notifier, NotifyError, SmtpNotifier};
pub use scan::{AssetOutcome, AssetReport, Pacer, ScanReport, Scanner, ThreadSleep};
