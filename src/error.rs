//! Error taxonomy for the generation pipeline.
//!
//! Classification drives policy: configuration and request errors fail fast,
//! completion errors are retryable within a stage's budget, and persistence
//! errors never discard an already-computed profile.
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing or unusable completion-service configuration. Fatal, no retry.
    #[error("completion service not configured: {0}")]
    Configuration(String),

    /// Malformed request, rejected before any generation work or persistence.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The completion call exceeded its hard timeout.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response from the completion service.
    #[error("completion service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure before an HTTP status was available.
    #[error("completion transport error: {0}")]
    Transport(String),

    /// No structured object could be extracted from the completion response.
    #[error("completion response parse failed: {0}")]
    Parse(String),

    /// A validator stayed false after the stage exhausted its retry budget.
    #[error("Stage {stage} failed after {attempts} attempts: {reason}")]
    QualityGate {
        stage: u32,
        attempts: u32,
        reason: String,
    },

    /// Store write failed. Logged, never discards a computed profile.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl GenerationError {
    /// Whether another attempt within the current stage budget may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout(_)
                | GenerationError::Http { .. }
                | GenerationError::Transport(_)
                | GenerationError::Parse(_)
        )
    }
}
