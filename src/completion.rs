//! Completion-service client.
//!
//! One prompt per call against an external HTTP text-completion service, with
//! a hard per-call timeout and a bounded backoff policy consulted by callers
//! between retry attempts. A timeout or non-2xx status is a retryable attempt
//! failure; missing configuration is fatal.
use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling temperature used for every generation call.
pub const TEMPERATURE: f32 = 0.7;

/// Hard timeout for multipass stage calls.
pub const MULTIPASS_TIMEOUT: Duration = Duration::from_secs(60);

/// Hard timeout for the single hybrid call.
pub const HYBRID_TIMEOUT: Duration = Duration::from_secs(30);

/// Output-token budget for the structure and enhancement stages.
pub const FULL_PROFILE_MAX_TOKENS: u32 = 4096;

/// Output-token budget for the refinement stage.
pub const REFINEMENT_MAX_TOKENS: u32 = 2048;

/// Output-token budget for the hybrid gap-fill call.
pub const HYBRID_MAX_TOKENS: u32 = 2048;

/// One prompt plus its per-call limits.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(prompt: String, max_tokens: u32, timeout: Duration) -> Self {
        CompletionRequest {
            prompt,
            temperature: TEMPERATURE,
            max_tokens,
            timeout,
        }
    }
}

/// A text-completion backend. Strategies depend on this seam so tests can
/// script responses without a network.
pub trait CompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// Bounded exponential backoff between retry attempts within one stage.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub multiplier: u32,
    pub cap: Duration,
}

impl BackoffPolicy {
    /// No delay between attempts. Used by tests and opt-out callers.
    pub fn none() -> Self {
        BackoffPolicy {
            base: Duration::ZERO,
            multiplier: 1,
            cap: Duration::ZERO,
        }
    }

    /// Delay before retrying after `failed_attempts` failures (>= 1).
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let factor = self
            .multiplier
            .saturating_pow(failed_attempts.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Sleep out the delay for the given failure count, if any.
    pub fn pause(&self, failed_attempts: u32) {
        let delay = self.delay_for(failed_attempts);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_millis(500),
            multiplier: 2,
            cap: Duration::from_secs(8),
        }
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct WireResponse {
    text: Option<String>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireError {
    message: Option<String>,
}

/// HTTP client for the completion service.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpCompletionClient {
    pub fn new(url: String, api_key: Option<String>, model: Option<String>) -> Self {
        HttpCompletionClient {
            url,
            api_key,
            model,
        }
    }

    /// Resolve the client from `PROFILEGEN_COMPLETION_URL`, with optional
    /// `PROFILEGEN_API_KEY` and `PROFILEGEN_MODEL`.
    pub fn from_env() -> Result<Self, GenerationError> {
        let url = std::env::var("PROFILEGEN_COMPLETION_URL").map_err(|_| {
            GenerationError::Configuration("PROFILEGEN_COMPLETION_URL is not set".into())
        })?;
        if url.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "PROFILEGEN_COMPLETION_URL is empty".into(),
            ));
        }
        let api_key = std::env::var("PROFILEGEN_API_KEY").ok();
        let model = std::env::var("PROFILEGEN_MODEL").ok();
        Ok(Self::new(url, api_key, model))
    }

    fn map_transport_error(&self, err: ureq::Error, timeout: Duration) -> GenerationError {
        match err {
            ureq::Error::Timeout(_) => GenerationError::Timeout(timeout),
            other => GenerationError::Transport(other.to_string()),
        }
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(request.timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();

        let body = WireRequest {
            model: self.model.as_deref(),
            prompt: &request.prompt,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = agent.post(&self.url);
        if let Some(key) = &self.api_key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }

        let mut response = builder
            .send_json(&body)
            .map_err(|err| self.map_transport_error(err, request.timeout))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| self.map_transport_error(err, request.timeout))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<WireResponse>(&text)
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|error| error.message)
                .unwrap_or_else(|| crate::extract::snippet(&text, 200).to_string());
            tracing::debug!(status, "completion call rejected");
            return Err(GenerationError::Http { status, message });
        }

        let parsed: WireResponse = serde_json::from_str(&text).map_err(|err| {
            GenerationError::Parse(format!("completion envelope is not JSON: {err}"))
        })?;
        match parsed.text {
            Some(completion) => Ok(completion),
            None => Err(GenerationError::Parse(
                "completion envelope missing `text`".into(),
            )),
        }
    }
}
