//! Advisory collaborator: turns an evidence bundle into a mail subject and body.
//!
//! The model is asked for `{"subject", "body"}` JSON. Anything else, including
//! a transport failure, falls back to a deterministic message built from the
//! bundle, so a triggered signal is always delivered.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AdvisorySection;
use crate::evidence::{escape_html, EvidenceBundle};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("advisory request failed: {0}")]
    Transport(String),
    #[error("advisory service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed advisory response: {0}")]
    Malformed(String),
    #[error("advisory disabled")]
    Disabled,
}

/// Generative-text service.
pub trait Advisor: Send + Sync {
    /// Send a prompt, return the raw text reply.
    fn advise(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

/// Mail subject and HTML body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub subject: String,
    pub body: String,
}

impl Advice {
    /// Deterministic message used when the advisory reply is unusable.
    pub fn fallback(bundle: &EvidenceBundle) -> Self {
        let snapshot = &bundle.signal.snapshot;
        let params = &bundle.params;
        Self {
            subject: format!("Buy Signal: {}", bundle.symbol()),
            body: format!(
                "<p>Price ${:.2} is at MA{} support (${:.2}) in an uptrend above MA{} (${:.2}).</p>\
                 <p>Backtest: {}.</p>",
                snapshot.price,
                params.short_window,
                snapshot.short_ma,
                params.long_window,
                snapshot.long_ma,
                escape_html(&bundle.backtest.describe(params.holding_period)),
            ),
        }
    }
}

/// Parse a model reply into [`Advice`], tolerating markdown code fences.
pub fn parse_advice(raw: &str) -> Result<Advice, AdvisoryError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let advice: Advice = serde_json::from_str(cleaned.trim())
        .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
    if advice.subject.trim().is_empty() || advice.body.trim().is_empty() {
        return Err(AdvisoryError::Malformed("empty subject or body".into()));
    }
    Ok(advice)
}

/// Ask the advisor and fall back on any failure. Never fails.
pub fn advise_or_fallback(advisor: &dyn Advisor, bundle: &EvidenceBundle) -> Advice {
    let result = advisor
        .advise(&bundle.prompt())
        .and_then(|raw| parse_advice(&raw));
    match result {
        Ok(advice) => advice,
        Err(AdvisoryError::Disabled) => {
            debug!(symbol = bundle.symbol(), "advisory disabled, using fallback message");
            Advice::fallback(bundle)
        }
        Err(e) => {
            warn!(symbol = bundle.symbol(), error = %e, "advisory unusable, using fallback message");
            Advice::fallback(bundle)
        }
    }
}

/// Advisor that always declines (offline and dry runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAdvisor;

impl Advisor for NoAdvisor {
    fn advise(&self, _prompt: &str) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::Disabled)
    }
}

// ── Gemini generateContent ───────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

fn reply_text(resp: GenerateResponse) -> Result<String, AdvisoryError> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(AdvisoryError::Malformed("no candidate text".into()));
    }
    Ok(text)
}

/// Google Gemini client.
pub struct GeminiAdvisor {
    client: reqwest::blocking::Client,
    api_key: SecretString,
    model: String,
    temperature: f32,
    base_url: String,
}

impl GeminiAdvisor {
    pub fn new(api_key: SecretString, settings: &AdvisorySection) -> Result<Self, AdvisoryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AdvisoryError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model: settings.model.trim_start_matches("models/").to_string(),
            temperature: settings.temperature,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl Advisor for GeminiAdvisor {
    fn advise(&self, prompt: &str) -> Result<String, AdvisoryError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, "advisory request");
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .map_err(|e| AdvisoryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AdvisoryError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
        reply_text(parsed)
    }
}
