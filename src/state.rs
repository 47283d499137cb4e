//! Generation status state machine.
//!
//! Status is a real sum type with an exhaustive transition function so invalid
//! edges are rejected instead of silently stored as free-form labels. Only the
//! orchestrator writes state; strategies return results.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle of a persisted profile row.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Pending,
    Generating,
    Complete,
    Failed,
    NeedsHuman,
}

/// Rejected state transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid generation state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: GenerationState,
    pub to: GenerationState,
}

impl GenerationState {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Pending => "pending",
            GenerationState::Generating => "generating",
            GenerationState::Complete => "complete",
            GenerationState::Failed => "failed",
            GenerationState::NeedsHuman => "needs_human",
        }
    }

    /// Whether this state ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationState::Complete | GenerationState::Failed | GenerationState::NeedsHuman
        )
    }

    /// Apply a transition, rejecting edges outside the lifecycle.
    ///
    /// `pending -> generating -> {complete, failed, needs_human}`. A terminal
    /// state may re-enter `generating` only because a new request re-runs the
    /// row; no other edge exists.
    pub fn transition_to(self, to: GenerationState) -> Result<GenerationState, InvalidTransition> {
        let valid = match (self, to) {
            (GenerationState::Pending, GenerationState::Generating) => true,
            (GenerationState::Generating, next) => next.is_terminal(),
            (from, GenerationState::Generating) => from.is_terminal(),
            _ => false,
        };
        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
